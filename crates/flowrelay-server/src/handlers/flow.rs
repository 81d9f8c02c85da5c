//! Mapping catalogue, runFlow configuration and raw forwarding.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use flowrelay_core::{DispatchOptions, FlowAction, MappingSpec, RunFlowParams};
use flowrelay_http::ConfigSummary;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::SharedState;

#[derive(Serialize)]
pub struct MappingsResponse {
    names: Vec<String>,
    mappings: Vec<MappingSpec>,
}

/// `GET /api/mappings`
pub async fn list_mappings(State(state): State<SharedState>) -> Json<MappingsResponse> {
    let registry = state.mapper.registry();
    Json(MappingsResponse {
        names: registry.names().map(str::to_string).collect(),
        mappings: registry.specs().cloned().collect(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFlowConfigResponse {
    actions: Vec<FlowAction>,
    default_params: RunFlowParams,
    dispatch: DispatchOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    erp: Option<ConfigSummary>,
}

/// `GET /api/runflow-config`
pub async fn runflow_config(State(state): State<SharedState>) -> Json<RunFlowConfigResponse> {
    Json(RunFlowConfigResponse {
        actions: state.actions.clone(),
        default_params: RunFlowParams::default(),
        dispatch: state.options.clone(),
        erp: state.erp.as_ref().map(|c| c.config().summary()),
    })
}

/// `POST /api/runFlow`: pass the body through to the ERP unchanged.
///
/// Upstream failures come back as their folded error object with a 502.
pub async fn forward_run_flow(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let client = state.erp.as_ref().ok_or(ApiError::NotConfigured)?;
    let action = payload.get("action").and_then(Value::as_str).unwrap_or_default();
    info!(action, "forwarding runFlow request");
    let body = client.forward(payload).await;
    let status = if body.get("error").is_some() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };
    Ok((status, Json(body)))
}
