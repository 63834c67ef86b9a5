mod attributes;
mod config;
mod context;
mod cookies;
mod error;
mod evaluation;
mod experiments;
mod routes;
mod state;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::evaluation::{Datafile, DatafileClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;

    init_tracing(&config.log_level);

    let datafile = match &config.datafile_path {
        Some(path) => Datafile::load(path)?,
        None => {
            tracing::warn!("DATAFILE_PATH not set, every experiment will resolve to control");
            Datafile::default()
        }
    };
    tracing::info!(
        experiments = datafile.experiments.len(),
        events = datafile.events.len(),
        "datafile loaded"
    );

    let client = Arc::new(DatafileClient::new(datafile));
    let state = state::AppState {
        client: client.clone(),
        events: client,
        environment_type: config.environment_type,
    };

    let app = routes::routes().with_state(state);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;

    tracing::info!(
        addr = %config.addr(),
        environment = ?config.environment_type,
        "server is chilling"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "experiment_attributes_service={log_level},tower_http={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
