use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failure reported by an experiment client call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("experiment '{0}' not found in datafile")]
    UnknownExperiment(String),

    #[error("experiment '{0}' is not running")]
    ExperimentNotRunning(String),

    #[error("user does not match the audience of experiment '{0}'")]
    AudienceMismatch(String),

    #[error("no traffic allocated to bucket {bucket} of experiment '{experiment}'")]
    NoTrafficAllocated { experiment: String, bucket: u32 },

    #[error("event '{0}' not found in datafile")]
    UnknownEvent(String),

    #[error("experiment client unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} missing, it is required")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum DatafileError {
    #[error("failed to read datafile {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse datafile: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Client(#[from] ClientError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Client(ClientError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Client(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        (status, self.to_string()).into_response()
    }
}
