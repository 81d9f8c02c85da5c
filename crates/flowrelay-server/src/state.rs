//! Shared handler state.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use flowrelay_core::{DispatchOptions, FlowAction, Mapper, MappingRegistry, RemoteCall};
use flowrelay_http::RunFlowClient;

/// State shared by every handler; cheap to clone behind `Arc`.
pub struct AppState {
    pub mapper: Mapper,
    /// Transport batches are dispatched through.
    pub remote: Arc<dyn RemoteCall>,
    /// Concrete ERP client for raw forwarding and health probes, when configured.
    pub erp: Option<Arc<RunFlowClient>>,
    pub actions: Vec<FlowAction>,
    pub options: DispatchOptions,
    /// Cancelled on shutdown; in-flight dispatches stop between calls.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(registry: MappingRegistry, remote: Arc<dyn RemoteCall>) -> Self {
        Self {
            mapper: Mapper::new(Arc::new(registry)),
            remote,
            erp: None,
            actions: FlowAction::builtin(),
            options: DispatchOptions::default(),
            shutdown: CancellationToken::new(),
        }
    }

    /// State backed by a real ERP client, used for both dispatch and forwarding.
    pub fn with_erp(registry: MappingRegistry, client: RunFlowClient) -> Self {
        let client = Arc::new(client);
        let mut state = Self::new(registry, client.clone());
        state.erp = Some(client);
        state
    }

    pub fn options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }
}

pub type SharedState = Arc<AppState>;
