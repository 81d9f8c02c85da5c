//! Route definitions.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::SharedState;

/// Liveness and ERP reachability.
pub fn health_routes() -> Router<SharedState> {
    Router::new()
        .route("/health", get(handlers::health::basic_health))
        .route("/health/erp", get(handlers::health::erp_health))
}

/// Mapping, dispatch and forwarding.
pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/mappings", get(handlers::flow::list_mappings))
        .route("/api/runflow-config", get(handlers::flow::runflow_config))
        .route("/api/records/map", post(handlers::records::map_records))
        .route("/api/records/dispatch", post(handlers::records::dispatch_records))
        .route("/api/runFlow", post(handlers::flow::forward_run_flow))
}

/// Full application router with tracing and CORS.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
