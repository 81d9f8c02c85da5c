//! ERP endpoint configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors while loading [`ErpConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("environment variable {key} has invalid value {value:?}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Where and how to reach the ERP runFlow endpoints.
#[derive(Clone, Serialize, Deserialize)]
pub struct ErpConfig {
    /// e.g. "https://erp.example.com"
    pub base_url: String,
    /// Full `Authorization` header value ("Bearer …").
    pub authorization: String,
    #[serde(default = "default_run_flow_path")]
    pub run_flow_path: String,
    #[serde(default = "default_open_run_flow_path")]
    pub open_run_flow_path: String,
    /// Per-call timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Sent as the `app-version` header.
    #[serde(default = "default_app_version")]
    pub app_version: String,
}

fn default_run_flow_path() -> String {
    "/api/runFlow".into()
}

fn default_open_run_flow_path() -> String {
    "/api/open/runFlow".into()
}

fn default_timeout_ms() -> u64 {
    100_000
}

fn default_app_version() -> String {
    "v1.1.96".into()
}

// Keep the token out of logs.
impl std::fmt::Debug for ErpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErpConfig")
            .field("base_url", &self.base_url)
            .field("authorization", &"<redacted>")
            .field("run_flow_path", &self.run_flow_path)
            .field("open_run_flow_path", &self.open_run_flow_path)
            .field("timeout_ms", &self.timeout_ms)
            .field("app_version", &self.app_version)
            .finish()
    }
}

/// Redacted view for startup banners and health output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    pub base_url: String,
    pub app_version: String,
    pub has_authorization: bool,
}

impl ErpConfig {
    pub fn new(base_url: impl Into<String>, authorization: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            authorization: authorization.into(),
            run_flow_path: default_run_flow_path(),
            open_run_flow_path: default_open_run_flow_path(),
            timeout_ms: default_timeout_ms(),
            app_version: default_app_version(),
        }
    }

    /// Read `ERP_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source. `ERP_BASE_URL` and
    /// `ERP_AUTHORIZATION` are required; the rest fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| lookup(key).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::MissingEnv(key));

        let mut config = Self::new(require("ERP_BASE_URL")?, require("ERP_AUTHORIZATION")?);
        if let Some(path) = get("ERP_RUN_FLOW_PATH") {
            config.run_flow_path = path;
        }
        if let Some(path) = get("ERP_OPEN_RUN_FLOW_PATH") {
            config.open_run_flow_path = path;
        }
        if let Some(raw) = get("ERP_TIMEOUT") {
            config.timeout_ms = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { key: "ERP_TIMEOUT", value: raw })?;
        }
        if let Some(version) = get("ERP_APP_VERSION") {
            config.app_version = version;
        }
        Ok(config)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn run_flow_url(&self) -> String {
        join_url(&self.base_url, &self.run_flow_path)
    }

    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            base_url: self.base_url.clone(),
            app_version: self.app_version.clone(),
            has_authorization: !self.authorization.is_empty(),
        }
    }
}

/// `base` + `path` with exactly one slash between them.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
