use axum::{routing::get, Json, Router};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{openapi::ApiDoc, state::AppState};

use super::handlers;

pub fn create_router(state: AppState) -> (Router, utoipa::openapi::OpenApi) {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(handlers::health))
        .with_state(state)
        .split_for_parts();

    (router, api)
}

/// API routes plus the generated document at `/openapi.json`
pub fn create_app(state: AppState) -> Router {
    let (router, api) = create_router(state);
    router.route("/openapi.json", get(move || async move { Json(api) }))
}
