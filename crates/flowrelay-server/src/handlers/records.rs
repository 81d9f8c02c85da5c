//! Mapping and dispatch of uploaded sheet rows.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use flowrelay_core::{DispatchSummary, Dispatcher, Record, RunFlowParams};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::SharedState;

const DEFAULT_TEST_LIMIT: usize = 1000;

fn default_mapping_type() -> String {
    "materials".to_string()
}

fn default_test_limit() -> usize {
    DEFAULT_TEST_LIMIT
}

/// Header row plus data rows, as read from a sheet.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsRequest {
    #[serde(default = "default_mapping_type")]
    pub mapping_type: String,
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    #[serde(flatten)]
    pub rows: RowsRequest,
    pub flow_id: Option<String>,
    pub action: Option<String>,
    pub batch_size: Option<usize>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default = "default_test_limit")]
    pub test_limit: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapResponse {
    valid: Vec<Record>,
    invalid: Vec<Record>,
    total_count: usize,
    valid_count: usize,
    invalid_count: usize,
    filter_rate: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    #[serde(flatten)]
    summary: DispatchSummary,
    message: String,
    invalid_count: usize,
    test_mode: bool,
}

/// `POST /api/records/map`
pub async fn map_records(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<RowsRequest>,
) -> Result<Json<MapResponse>, ApiError> {
    let mapped = state.mapper.map(&req.mapping_type, &req.headers, &req.rows)?;
    let filter_rate = mapped.filter_rate();
    let total_count = mapped.total();

    Ok(Json(MapResponse {
        valid_count: mapped.valid.len(),
        invalid_count: mapped.invalid.len(),
        total_count,
        filter_rate,
        valid: mapped.valid,
        invalid: mapped.invalid,
    }))
}

/// `POST /api/records/dispatch`: map, optionally truncate, then dispatch.
pub async fn dispatch_records(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<DispatchRequest>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let mapped = state
        .mapper
        .map(&req.rows.mapping_type, &req.rows.headers, &req.rows.rows)?;
    if !mapped.invalid.is_empty() {
        warn!(
            invalid = mapped.invalid.len(),
            filter_rate = mapped.filter_rate(),
            "rows filtered before dispatch"
        );
    }

    let mut records = mapped.valid;
    let test_limit = if req.test_limit > 0 {
        req.test_limit
    } else {
        DEFAULT_TEST_LIMIT
    };
    if req.test_mode && records.len() > test_limit {
        info!(limit = test_limit, total = records.len(), "test mode: truncating records");
        records.truncate(test_limit);
    }

    let mut options = state.options.clone();
    if let Some(n) = req.batch_size {
        options = options.batch_size(n);
    }
    if let Some(n) = req.max_retries {
        options = options.max_retries(n);
    }
    if let Some(ms) = req.retry_delay_ms {
        options = options.retry_delay(Duration::from_millis(ms));
    }

    let params = RunFlowParams::or_default(req.flow_id, req.action);
    let dispatcher = Dispatcher::new(state.remote.clone(), options)
        .with_cancel(state.shutdown.child_token());
    let summary = dispatcher.dispatch(&records, &params.to_map()).await?;

    Ok(Json(DispatchResponse {
        message: summary.message(),
        invalid_count: mapped.invalid.len(),
        test_mode: req.test_mode,
        summary,
    }))
}
