//! flowrelay-core: record mapping and batch dispatch for FlowRelay.
//!
//! # Overview
//!
//! FlowRelay takes tabular rows from a spreadsheet reader, maps them into
//! typed records and forwards them in batches to a remote `runFlow`
//! endpoint. The core crate defines:
//!
//! - [`Record`] / [`FieldValue`]: the coerced record shape
//! - [`MappingSpec`] / [`MappingRegistry`]: typed column mappings
//! - [`Mapper`]: rows → valid / invalid records
//! - [`Dispatcher`]: sequential batch dispatch with bounded retry
//! - [`RemoteCall`]: the async trait every transport implements
//! - [`policy`] module: retry delay policy

pub mod batch;
pub mod dispatch;
pub mod error;
pub mod flow;
pub mod mapper;
pub mod policy;
pub mod record;
pub mod schema;
pub mod transport;

pub use batch::{Batch, BatchInfo};
pub use dispatch::{BatchOutcome, DispatchOptions, DispatchSummary, Dispatcher};
pub use error::{DispatchError, MapError, RemoteError};
pub use flow::{FlowAction, RunFlowParams};
pub use mapper::{MappedRows, Mapper};
pub use record::{FieldValue, Record};
pub use schema::{FieldKind, FieldSpec, MappingRegistry, MappingSpec, MaterialsPolicy};
pub use transport::RemoteCall;
