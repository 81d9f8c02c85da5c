//! Retry policy for per-batch remote calls.
//!
//! ```text
//! Batch → [RetryPolicy] → [RemoteCall]
//! ```

pub mod retry;

pub use retry::RetryPolicy;
