use axum::{
    extract::State,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};

use crate::services::{HealthState, HealthStatus};
use crate::state::AppState;

const OPENMETRICS_MEDIA_TYPE: &str = "application/openmetrics-text";
const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text;version=1.0.0;charset=utf-8";

/// Process health, as JSON or as OpenMetrics text
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Process is healthy", body = HealthStatus),
        (status = 503, description = "Process is unhealthy", body = HealthStatus)
    )
)]
pub async fn health(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let wants_openmetrics = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(OPENMETRICS_MEDIA_TYPE));

    if wants_openmetrics {
        return (
            [(CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)],
            state.metrics.render_openmetrics(),
        )
            .into_response();
    }

    let status = state.metrics.snapshot();
    let code = match status.status {
        HealthState::Healthy => StatusCode::OK,
        HealthState::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (code, Json(status)).into_response()
}
