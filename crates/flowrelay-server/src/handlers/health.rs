//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use flowrelay_http::{HealthReport, HealthStatus};

use crate::error::ApiError;
use crate::state::SharedState;

/// Basic health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
}

/// `GET /health`: the process is up.
pub async fn basic_health(_state: State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `GET /health/erp`: probe the configured ERP endpoint.
///
/// Answers 502 with the report when the probe fails.
pub async fn erp_health(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<HealthReport>), ApiError> {
    let client = state.erp.as_ref().ok_or(ApiError::NotConfigured)?;
    let report = client.health_check().await;
    let status = match report.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => {
            warn!(message = %report.message, "ERP health check failed");
            StatusCode::BAD_GATEWAY
        }
    };
    Ok((status, Json(report)))
}
