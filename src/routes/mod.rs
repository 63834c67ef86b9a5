use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod experiments;
mod health;
mod session;

pub use health::health;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    let api_router = Router::new()
        .route("/attributes", post(experiments::routes::attributes))
        .route(
            "/experiments/{experiment_key}/variant",
            post(experiments::routes::variant),
        )
        .route("/events/{event_key}/track", post(experiments::routes::track))
        .route("/events/recent", get(experiments::routes::recent_events));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn root() -> &'static str {
    "Experiment attributes service"
}
