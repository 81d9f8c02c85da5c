//! flowrelay-http: runFlow transport over HTTP.
//!
//! Provides [`RunFlowClient`], the production [`RemoteCall`] implementation,
//! and [`ErpConfig`], the endpoint / credential settings it is built from.
//!
//! [`RemoteCall`]: flowrelay_core::RemoteCall

pub mod client;
pub mod config;

pub use client::{error_body, HealthReport, HealthStatus, RunFlowClient};
pub use config::{ConfigError, ConfigSummary, ErpConfig};
