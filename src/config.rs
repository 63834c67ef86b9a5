use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

use crate::context::EnvironmentType;
use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment_type: EnvironmentType,
    pub datafile_path: Option<PathBuf>,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv().is_ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT")
            .ok_or(ConfigError::Missing("PORT"))?
            .parse::<u16>()
            .map_err(|_| ConfigError::Invalid {
                name: "PORT",
                reason: "must be a valid u16 number".to_string(),
            })?;

        let environment_type = match lookup("APP_ENV") {
            Some(raw) => raw
                .parse::<EnvironmentType>()
                .map_err(|reason| ConfigError::Invalid { name: "APP_ENV", reason })?,
            None => EnvironmentType::default(),
        };

        let datafile_path = lookup("DATAFILE_PATH")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            port,
            environment_type,
            datafile_path,
            log_level,
        })
    }

    pub fn addr(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }
}
