use utoipa::OpenApi;

use crate::services::{HealthState, HealthStatus};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Feed Pipeline API",
        version = "1.0.0"
    ),
    tags(
        (name = "health", description = "Process health and metrics")
    ),
    components(schemas(HealthStatus, HealthState))
)]
pub struct ApiDoc;
