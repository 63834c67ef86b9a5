use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use axum_extra::extract::CookieJar;

use crate::attributes::{tracking_attributes_and_event_tags, user_attributes};
use crate::error::ApiError;
use crate::experiments::{self, track_event, ExperimentKey};
use crate::routes::session::SessionRequest;
use crate::state::AppState;
use super::{AttributesResponse, VariantResponse};

/// Build the targeting attributes and event tags for a session
pub async fn attributes(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SessionRequest>,
) -> impl IntoResponse {
    let ref_tag = request.ref_tag();
    let env = request.context.into_environment(state.environment_type);

    let (attributes, event_tags) =
        tracking_attributes_and_event_tags(&env, &jar, request.project.as_ref(), ref_tag.as_ref());

    Json(AttributesResponse {
        attributes,
        event_tags,
    })
}

/// Resolve the variant of an experiment; always answers, falling back to control
pub async fn variant(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(experiment_key): Path<String>,
    Json(request): Json<SessionRequest>,
) -> impl IntoResponse {
    let ref_tag = request.ref_tag();
    let env = request.context.into_environment(state.environment_type);
    let experiment = ExperimentKey(experiment_key);

    // Without a project or ref tag the default session attributes apply
    let attributes = (request.project.is_some() || ref_tag.is_some())
        .then(|| user_attributes(&env, &jar, request.project.as_ref(), ref_tag.as_ref()));
    let resolution = experiments::variant(
        state.client.as_ref(),
        &env,
        &jar,
        &experiment,
        attributes.as_ref(),
    );

    Json(VariantResponse::new(experiment, &resolution))
}

/// Track a conversion event
pub async fn track(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(event_key): Path<String>,
    Json(request): Json<SessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ref_tag = request.ref_tag();
    let env = request.context.into_environment(state.environment_type);

    track_event(
        state.client.as_ref(),
        &env,
        &jar,
        &event_key,
        request.project.as_ref(),
        ref_tag.as_ref(),
    )
    .map_err(|e| {
        tracing::warn!(event_key = %event_key, error = %e, "failed to track event");
        ApiError::from(e)
    })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Most recent impressions and conversions, oldest first
pub async fn recent_events(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.events.dispatched())
}
