//! flowrelay-server: JSON HTTP API over the FlowRelay mapper and dispatcher.
//!
//! # Quick Start
//! ```rust,no_run
//! use std::sync::Arc;
//! use flowrelay_core::{MappingRegistry, MaterialsPolicy};
//! use flowrelay_http::{ErpConfig, RunFlowClient};
//! use flowrelay_server::{serve, AppState};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RunFlowClient::new(ErpConfig::from_env()?)?;
//! let state = AppState::with_erp(MappingRegistry::with_builtin(MaterialsPolicy::default()), client);
//! serve("0.0.0.0:3000".parse()?, Arc::new(state)).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, SharedState};

use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Bind `addr` and serve until the state's shutdown token is cancelled.
pub async fn serve(addr: SocketAddr, state: SharedState) -> std::io::Result<()> {
    let shutdown = state.shutdown.clone();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "flowrelay server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("flowrelay server stopped");
    Ok(())
}
