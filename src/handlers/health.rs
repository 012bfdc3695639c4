use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{AppState, config::Env};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
}

/// health
///
/// [Public Route] Liveness probe for load balancers and uptime checks.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let environment = match state.config.env {
        Env::Local => "local",
        Env::Production => "production",
    };
    Json(HealthResponse {
        success: true,
        message: "Morphe CMS API is running".to_string(),
        timestamp: Utc::now(),
        environment: environment.to_string(),
    })
}
