//! `Dispatcher` sends a record set to the remote flow in sequential batches.
//!
//! Batches go out one at a time. A failing batch is retried up to
//! `max_retries` more times, `retry_delay` apart; when retries run out the
//! batch is recorded as failed and the loop moves on. Between batches the
//! dispatcher waits `retry_delay` to pace the downstream system.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::batch::{batch_count, partition, Batch};
use crate::error::DispatchError;
use crate::policy::retry::millis;
use crate::policy::RetryPolicy;
use crate::record::Record;
use crate::transport::RemoteCall;

/// Tuning knobs for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOptions {
    /// Records per batch; must be > 0.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Extra attempts after the first failure of a batch.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Wait between retries and between batches (zero disables both).
    #[serde(rename = "retryDelayMs", with = "millis", default = "default_retry_delay")]
    pub retry_delay: Duration,
}

fn default_batch_size() -> usize {
    200
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(1_000)
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

impl DispatchOptions {
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn retry_delay(mut self, d: Duration) -> Self {
        self.retry_delay = d;
        self
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.batch_size == 0 {
            return Err(DispatchError::InvalidOptions(
                "batchSize must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_retries, self.retry_delay)
    }
}

/// Result of dispatching one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    /// 1-based batch number.
    pub batch_index: usize,
    /// Position of the batch's first record in the dispatched sequence.
    pub offset: usize,
    pub data_count: usize,
    pub success: bool,
    /// Remote calls made for this batch.
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchOutcome {
    fn succeeded(batch: &Batch<'_>, attempts: u32, result: Value) -> Self {
        Self {
            batch_index: batch.index,
            offset: batch.offset,
            data_count: batch.len(),
            success: true,
            attempts,
            result: Some(result),
            error: None,
        }
    }

    fn failed(batch: &Batch<'_>, attempts: u32, error: String) -> Self {
        Self {
            batch_index: batch.index,
            offset: batch.offset,
            data_count: batch.len(),
            success: false,
            attempts,
            result: None,
            error: Some(error),
        }
    }
}

/// Aggregate over every batch of one dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    /// `true` when no batch failed.
    pub success: bool,
    pub total_count: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub batch_count: usize,
    /// One outcome per batch, in batch order.
    pub results: Vec<BatchOutcome>,
}

impl DispatchSummary {
    fn from_outcomes(total_count: usize, results: Vec<BatchOutcome>) -> Self {
        let (ok, failed): (Vec<&BatchOutcome>, Vec<&BatchOutcome>) =
            results.iter().partition(|o| o.success);
        let success_count: usize = ok.iter().map(|o| o.data_count).sum();
        let error_count: usize = failed.iter().map(|o| o.data_count).sum();
        Self {
            success: error_count == 0,
            total_count,
            success_count,
            error_count,
            batch_count: results.len(),
            results,
        }
    }

    /// Operator-facing one-line result.
    pub fn message(&self) -> String {
        format!(
            "batch dispatch finished: {} succeeded, {} failed, {} batches",
            self.success_count, self.error_count, self.batch_count
        )
    }

    pub fn failed_outcomes(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.results.iter().filter(|o| !o.success)
    }

    /// Records of every failed batch, in order, ready for resubmission.
    ///
    /// `records` must be the sequence this summary was produced from.
    pub fn failed_records(&self, records: &[Record]) -> Vec<Record> {
        self.failed_outcomes()
            .filter_map(|o| records.get(o.offset..o.offset + o.data_count))
            .flat_map(|slice| slice.iter().cloned())
            .collect()
    }
}

type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Sequential batch dispatcher over an injected [`RemoteCall`].
#[derive(Clone)]
pub struct Dispatcher {
    remote: Arc<dyn RemoteCall>,
    options: DispatchOptions,
    cancel: CancellationToken,
    on_progress: Option<ProgressFn>,
}

impl Dispatcher {
    pub fn new(remote: Arc<dyn RemoteCall>, options: DispatchOptions) -> Self {
        Self {
            remote,
            options,
            cancel: CancellationToken::new(),
            on_progress: None,
        }
    }

    /// Use `token` to stop the dispatch between calls.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Called with `(completed_batches, total_batches)` after every batch.
    pub fn on_progress<F: Fn(usize, usize) + Send + Sync + 'static>(mut self, f: F) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Dispatch `records` with `params` merged into every batch payload.
    ///
    /// Fails only on invalid input or cancellation; failed batches are
    /// reported in the summary.
    pub async fn dispatch(
        &self,
        records: &[Record],
        params: &Map<String, Value>,
    ) -> Result<DispatchSummary, DispatchError> {
        if records.is_empty() {
            return Err(DispatchError::EmptyInput);
        }
        self.options.validate()?;

        let total_count = records.len();
        let batch_size = self.options.batch_size;
        let total_batches = batch_count(total_count, batch_size);
        let policy = self.options.retry_policy();

        info!(
            total = total_count,
            batches = total_batches,
            batch_size,
            endpoint = self.remote.endpoint(),
            "starting batch dispatch"
        );

        let mut results = Vec::with_capacity(total_batches);
        for batch in partition(records, batch_size) {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(results.len()));
            }
            debug!(batch = batch.index, total = batch.total, size = batch.len(), "sending batch");

            let outcome = self.send_batch(&batch, params, &policy, results.len()).await?;
            if outcome.success {
                info!(batch = batch.index, total = batch.total, attempts = outcome.attempts, "batch succeeded");
            } else {
                error!(
                    batch = batch.index,
                    total = batch.total,
                    error = outcome.error.as_deref().unwrap_or_default(),
                    "batch failed"
                );
            }
            results.push(outcome);

            if let Some(cb) = &self.on_progress {
                cb(results.len(), total_batches);
            }

            if !batch.is_last() {
                self.pause(self.options.retry_delay, results.len()).await?;
            }
        }

        let summary = DispatchSummary::from_outcomes(total_count, results);
        info!(
            success = summary.success,
            total = summary.total_count,
            succeeded = summary.success_count,
            failed = summary.error_count,
            batches = summary.batch_count,
            "batch dispatch finished"
        );
        Ok(summary)
    }

    /// Send one batch, retrying per `policy`. Exhausted retries yield a
    /// failed outcome, not an error.
    async fn send_batch(
        &self,
        batch: &Batch<'_>,
        params: &Map<String, Value>,
        policy: &RetryPolicy,
        completed: usize,
    ) -> Result<BatchOutcome, DispatchError> {
        let payload = match batch.payload(params) {
            Ok(p) => p,
            Err(e) => return Ok(BatchOutcome::failed(batch, 0, e.to_string())),
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.remote.call(payload.clone()).await {
                Ok(result) => return Ok(BatchOutcome::succeeded(batch, attempt, result)),
                Err(e) => match policy.next_delay(attempt) {
                    Some(delay) => {
                        warn!(
                            batch = batch.index,
                            attempt,
                            max_retries = policy.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            retryable = e.is_retryable(),
                            error = %e,
                            "batch call failed, retrying"
                        );
                        self.pause(delay, completed).await?;
                    }
                    None => {
                        return Ok(BatchOutcome::failed(batch, attempt, e.to_string()));
                    }
                },
            }
        }
    }

    /// Sleep for `delay` unless cancelled first.
    async fn pause(&self, delay: Duration, completed: usize) -> Result<(), DispatchError> {
        if self.cancel.is_cancelled() {
            return Err(self.cancelled(completed));
        }
        if delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = self.cancel.cancelled() => Err(self.cancelled(completed)),
        }
    }

    fn cancelled(&self, completed: usize) -> DispatchError {
        warn!(completed, "batch dispatch cancelled");
        DispatchError::Cancelled { completed }
    }
}
