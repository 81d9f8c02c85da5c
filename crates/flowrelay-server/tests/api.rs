//! Router behaviour with an in-process remote.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use flowrelay_core::{DispatchOptions, MappingRegistry, MaterialsPolicy, RemoteCall, RemoteError};
use flowrelay_http::{ErpConfig, RunFlowClient};
use flowrelay_server::{router, AppState};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records every payload; fails batches whose index is listed.
#[derive(Default)]
struct RecordingRemote {
    fail_batches: Vec<u64>,
    payloads: Mutex<Vec<Value>>,
}

#[async_trait]
impl RemoteCall for RecordingRemote {
    async fn call(&self, payload: Value) -> Result<Value, RemoteError> {
        let current = payload["batchInfo"]["current"].as_u64().unwrap_or_default();
        self.payloads.lock().unwrap().push(payload);
        if self.fail_batches.contains(&current) {
            return Err(RemoteError::Http("connection reset".into()));
        }
        Ok(json!({ "code": 0 }))
    }

    fn endpoint(&self) -> &str {
        "mock://erp"
    }
}

fn app_with(remote: Arc<RecordingRemote>) -> axum::Router {
    let options = DispatchOptions::default()
        .batch_size(2)
        .max_retries(1)
        .retry_delay(Duration::ZERO);
    let state = AppState::new(MappingRegistry::with_builtin(MaterialsPolicy::default()), remote)
        .options(options);
    router(Arc::new(state))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn materials_rows(n: usize) -> Value {
    let rows: Vec<Value> = (0..n)
        .map(|i| json!([format!("M{i:03}"), format!("item {i}"), "12.5", "13", "11.06"]))
        .collect();
    json!({
        "headers": ["产品编码", "产品名称", "采购价", "税点", "不含税采购价"],
        "rows": rows,
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app_with(Arc::default());
    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn erp_routes_need_a_configured_client() {
    let app = app_with(Arc::default());
    let resp = app
        .clone()
        .oneshot(Request::get("/health/erp").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let resp = app
        .oneshot(post_json("/api/runFlow", json!({ "action": "query_order_record" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(resp).await["error"]["code"], "NOT_CONFIGURED");
}

#[tokio::test]
async fn mappings_and_config_are_listed() {
    let app = app_with(Arc::default());
    let resp = app
        .clone()
        .oneshot(Request::get("/api/mappings").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["names"], json!(["materials"]));
    assert_eq!(body["mappings"][0]["displayName"], "材料表");

    let resp = app
        .oneshot(Request::get("/api/runflow-config").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["defaultParams"]["action"], "materials_excel");
    assert_eq!(body["dispatch"]["batchSize"], 2);
    assert_eq!(body["actions"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn map_splits_valid_and_invalid_rows() {
    let app = app_with(Arc::default());
    let mut req = materials_rows(3);
    req["rows"][1][2] = json!("");
    let resp = app.oneshot(post_json("/api/records/map", req)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["totalCount"], 3);
    assert_eq!(body["validCount"], 2);
    assert_eq!(body["invalidCount"], 1);
    assert_eq!(body["filterRate"], 33);
    assert_eq!(body["valid"][0]["number"], "M000");
    assert_eq!(body["valid"][0]["taxRate"], 13);
    assert_eq!(body["invalid"][0]["number"], "M001");
}

#[tokio::test]
async fn unknown_mapping_is_bad_request() {
    let app = app_with(Arc::default());
    let mut req = materials_rows(1);
    req["mappingType"] = json!("customers");
    let resp = app.oneshot(post_json("/api/records/map", req)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "UNSUPPORTED_MAPPING");
}

#[tokio::test]
async fn dispatch_reports_summary() {
    let remote = Arc::new(RecordingRemote {
        fail_batches: vec![2],
        ..Default::default()
    });
    let app = app_with(remote.clone());
    let mut req = materials_rows(5);
    req["flowId"] = json!("flow-1");
    let resp = app.oneshot(post_json("/api/records/dispatch", req)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["totalCount"], 5);
    assert_eq!(body["batchCount"], 3);
    assert_eq!(body["successCount"], 3);
    assert_eq!(body["errorCount"], 2);
    assert_eq!(body["success"], false);
    assert_eq!(body["results"][1]["attempts"], 2);
    assert_eq!(body["message"], "batch dispatch finished: 3 succeeded, 2 failed, 3 batches");

    let payloads = remote.payloads.lock().unwrap();
    assert_eq!(payloads.len(), 4);
    assert_eq!(payloads[0]["flowId"], "flow-1");
    assert_eq!(payloads[0]["action"], "materials_excel");
}

#[tokio::test]
async fn test_mode_truncates_to_limit() {
    let remote = Arc::new(RecordingRemote::default());
    let app = app_with(remote.clone());
    let mut req = materials_rows(5);
    req["testMode"] = json!(true);
    req["testLimit"] = json!(3);
    req["batchSize"] = json!(10);
    let resp = app.oneshot(post_json("/api/records/dispatch", req)).await.unwrap();

    let body = body_json(resp).await;
    assert_eq!(body["totalCount"], 3);
    assert_eq!(body["batchCount"], 1);
    assert_eq!(body["testMode"], true);
    assert_eq!(remote.payloads.lock().unwrap()[0]["data"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn dispatch_without_valid_rows_is_rejected() {
    let remote = Arc::new(RecordingRemote::default());
    let app = app_with(remote.clone());
    let mut req = materials_rows(1);
    req["rows"][0][0] = json!("");
    let resp = app.oneshot(post_json("/api/records/dispatch", req)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"]["code"], "EMPTY_INPUT");
    assert!(remote.payloads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn zero_test_limit_falls_back_to_default() {
    let remote = Arc::new(RecordingRemote::default());
    let app = app_with(remote.clone());
    let mut req = materials_rows(5);
    req["testMode"] = json!(true);
    req["testLimit"] = json!(0);
    let resp = app.oneshot(post_json("/api/records/dispatch", req)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["totalCount"], 5);
    assert_eq!(body["successCount"], 5);
    assert_eq!(remote.payloads.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn malformed_body_gets_error_envelope() {
    let app = app_with(Arc::default());
    let req = Request::builder()
        .method("POST")
        .uri("/api/records/map")
        .header("content-type", "application/json")
        .body(Body::from("{\"headers\": [\"产品编码\""))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].is_string());
}

async fn erp_app(erp: &MockServer) -> axum::Router {
    let client = RunFlowClient::new(ErpConfig::new(erp.uri(), "Bearer t")).unwrap();
    let state = AppState::with_erp(MappingRegistry::with_builtin(MaterialsPolicy::default()), client);
    router(Arc::new(state))
}

#[tokio::test]
async fn run_flow_forwards_to_erp() {
    let erp = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/runFlow"))
        .and(body_partial_json(json!({ "action": "query_order_record" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rows": [1, 2] })))
        .expect(1)
        .mount(&erp)
        .await;

    let resp = erp_app(&erp)
        .await
        .oneshot(post_json("/api/runFlow", json!({ "action": "query_order_record" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "rows": [1, 2] }));
}

#[tokio::test]
async fn run_flow_upstream_failure_is_bad_gateway() {
    let erp = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&erp)
        .await;

    let resp = erp_app(&erp)
        .await
        .oneshot(post_json("/api/runFlow", json!({ "action": "x" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Target API error");
    assert_eq!(body["statusCode"], 500);
}
