//! The `RemoteCall` trait: the capability the dispatcher sends batches through.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RemoteError;

/// One request/response exchange with the remote flow endpoint.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` for use across Tokio tasks.
///
/// # Object Safety
/// The trait is object-safe and can be stored as `Arc<dyn RemoteCall>`.
#[async_trait]
pub trait RemoteCall: Send + Sync + 'static {
    /// Send one payload and return the decoded response body.
    async fn call(&self, payload: Value) -> Result<Value, RemoteError>;

    /// Return the endpoint identifier (URL or name), for logs.
    fn endpoint(&self) -> &str;
}
