//! HTTP runFlow client backed by `reqwest`.
//!
//! Features:
//! - Authenticated runFlow calls (`Authorization` + `app-version` headers)
//! - Open-endpoint forwarding for callers that supply their own host
//! - Timeouts and non-2xx statuses surfaced as [`RemoteError`]s
//!
//! Retries are the dispatcher's job; one `call` is one HTTP request.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, HOST};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

use flowrelay_core::error::RemoteError;
use flowrelay_core::transport::RemoteCall;

use crate::config::{join_url, ErpConfig};

/// Timeout for the unauthenticated open endpoint.
const OPEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote health as seen by a probe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Result of [`RunFlowClient::health_check`].
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub message: String,
}

/// runFlow client for one ERP deployment.
pub struct RunFlowClient {
    config: ErpConfig,
    url: String,
    http: reqwest::Client,
}

impl RunFlowClient {
    pub fn new(config: ErpConfig) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| RemoteError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: config.run_flow_url(),
            config,
            http,
        })
    }

    pub fn config(&self) -> &ErpConfig {
        &self.config
    }

    fn auth_headers(&self) -> Result<HeaderMap, RemoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(AUTHORIZATION, header_value(&self.config.authorization)?);
        headers.insert("app-version", header_value(&self.config.app_version)?);
        Ok(headers)
    }

    async fn post(
        &self,
        url: &str,
        headers: HeaderMap,
        timeout: Duration,
        payload: &Value,
    ) -> Result<Value, RemoteError> {
        let resp = self
            .http
            .post(url)
            .headers(headers)
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| transport_error(e, timeout))?;
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(decode_body(body))
    }

    /// POST to `host_pre` + open path, optionally overriding `Host`.
    pub async fn call_open(
        &self,
        host_pre: &str,
        host: Option<&str>,
        payload: &Value,
    ) -> Result<Value, RemoteError> {
        let url = join_url(host_pre, &self.config.open_run_flow_path);
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        if let Some(host) = host {
            headers.insert(HOST, header_value(host)?);
        }

        tracing::info!(url = %url, "forwarding to open runFlow endpoint");
        let result = self.post(&url, headers, OPEN_TIMEOUT, payload).await?;
        tracing::debug!(url = %url, "open runFlow call succeeded");
        Ok(result)
    }

    /// Raw forwarding: payloads carrying `hostPre` go to that host's open
    /// endpoint, everything else to the authenticated runFlow endpoint.
    ///
    /// Never fails; errors come back as an `{"error": …}` object.
    pub async fn forward(&self, payload: Value) -> Value {
        let result = match payload.get("hostPre").and_then(Value::as_str) {
            Some(host_pre) => {
                let host = payload.get("host").and_then(Value::as_str);
                self.call_open(host_pre, host, &payload).await
            }
            None => self.call(payload).await,
        };

        result.unwrap_or_else(|e| {
            tracing::error!(error = %e, "forwarding failed");
            error_body(&e)
        })
    }

    /// Probe the runFlow endpoint with a `healthCheck` action.
    pub async fn health_check(&self) -> HealthReport {
        match self.call(json!({ "action": "healthCheck" })).await {
            Ok(_) => HealthReport {
                status: HealthStatus::Healthy,
                message: "ERP connection OK".into(),
            },
            Err(e) => HealthReport {
                status: HealthStatus::Unhealthy,
                message: format!("ERP connection failed: {e}"),
            },
        }
    }
}

#[async_trait]
impl RemoteCall for RunFlowClient {
    async fn call(&self, payload: Value) -> Result<Value, RemoteError> {
        let headers = self.auth_headers()?;
        let result = self
            .post(&self.url, headers, self.config.timeout(), &payload)
            .await?;
        tracing::debug!(url = %self.url, "runFlow call succeeded");
        Ok(result)
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

fn header_value(v: &str) -> Result<HeaderValue, RemoteError> {
    HeaderValue::from_str(v).map_err(|e| RemoteError::Other(format!("invalid header value: {e}")))
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout {
            ms: timeout.as_millis() as u64,
        }
    } else {
        RemoteError::Http(e.to_string())
    }
}

/// JSON when the body parses, the raw text otherwise, `null` when empty.
fn decode_body(body: String) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&body).unwrap_or(Value::String(body))
}

/// Error object returned to forwarding callers.
pub fn error_body(e: &RemoteError) -> Value {
    match e {
        RemoteError::Status { status, body } => json!({
            "error": "Target API error",
            "statusCode": status,
            "message": decode_body(body.clone()),
        }),
        RemoteError::NotFound(_) => json!({ "error": "Data file not found" }),
        other => json!({ "error": format!("Failed to fetch data: {other}") }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_decoding() {
        assert_eq!(decode_body(String::new()), Value::Null);
        assert_eq!(decode_body(r#"{"code":0}"#.into()), json!({"code": 0}));
        assert_eq!(decode_body("ok".into()), json!("ok"));
    }

    #[test]
    fn error_bodies() {
        let status = error_body(&RemoteError::Status {
            status: 401,
            body: r#"{"msg":"token expired"}"#.into(),
        });
        assert_eq!(status["statusCode"], 401);
        assert_eq!(status["message"]["msg"], "token expired");

        let missing = error_body(&RemoteError::NotFound("data.json".into()));
        assert_eq!(missing["error"], "Data file not found");

        let other = error_body(&RemoteError::Timeout { ms: 30_000 });
        assert_eq!(other["error"], "Failed to fetch data: request timed out after 30000ms");
    }

    #[test]
    fn endpoint_is_joined_url() {
        let client = RunFlowClient::new(ErpConfig::new("https://erp.example.com/", "Bearer t")).unwrap();
        assert_eq!(client.endpoint(), "https://erp.example.com/api/runFlow");
    }
}
