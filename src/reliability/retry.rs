use super::failure::{FailureRecord, FailureSink};
use crate::buffer::Batch;
use crate::sender::{ClientError, Deliverer, DeliveryEnvelope, DeliveryStats};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

const ABANDONED_REASON: &str = "abandoned at shutdown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Fixed pause before every retry; there is no backoff.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Attempt counter of one retry chain. Attempt 0 is the first delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
    max_retries: u32,
}

impl RetryState {
    pub fn new(max_retries: u32) -> Self {
        Self {
            attempt: 0,
            max_retries,
        }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Total deliveries tried so far, counting the first.
    pub fn attempts_made(&self) -> u32 {
        self.attempt + 1
    }

    /// Moves to the next retry; `false` once the budget is spent.
    pub fn advance(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.attempt += 1;
        true
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_retries
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    /// First attempt failed; a retry chain now runs in the background.
    Retrying,
}

#[derive(Debug)]
struct PendingDelivery {
    batch_id: String,
    entry_count: usize,
    envelope: DeliveryEnvelope,
}

/// Runs first delivery attempts inline and retry chains as supervised tasks.
///
/// Retry chains are detached from the consumer loop: a batch being retried
/// does not hold back later batches, so the collector may see batches out of
/// flush order whenever a retry is in flight.
#[derive(Clone)]
pub struct RetryController {
    deliverer: Deliverer,
    sink: FailureSink,
    config: RetryConfig,
    tracker: TaskTracker,
    cancel: CancellationToken,
    closing: Arc<AtomicBool>,
    stats: Arc<DeliveryStats>,
}

impl RetryController {
    pub fn new(
        deliverer: Deliverer,
        sink: FailureSink,
        config: RetryConfig,
        stats: Arc<DeliveryStats>,
    ) -> Self {
        Self {
            deliverer,
            sink,
            config,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            closing: Arc::new(AtomicBool::new(false)),
            stats,
        }
    }

    /// Delivers a sealed batch. Returns once the first attempt has finished;
    /// a failed batch continues on a background retry chain.
    pub async fn dispatch(&self, batch: Batch) -> DispatchOutcome {
        let envelope = self.deliverer.prepare(&batch);
        let delivery = PendingDelivery {
            batch_id: batch.id().to_string(),
            entry_count: batch.size(),
            envelope,
        };

        match self
            .deliverer
            .deliver(&delivery.batch_id, &delivery.envelope, 0)
            .await
        {
            Ok(()) => {
                self.stats.record_delivered(delivery.entry_count);
                DispatchOutcome::Delivered
            }
            Err(e) => {
                let controller = self.clone();
                self.tracker
                    .spawn(async move { controller.run_retry_chain(delivery, e).await });
                // Counted once the chain is tracked, so observers of the
                // counter also see the chain in `in_flight`.
                self.stats.record_first_attempt_failure();
                DispatchOutcome::Retrying
            }
        }
    }

    async fn run_retry_chain(&self, delivery: PendingDelivery, first_error: ClientError) {
        let mut state = RetryState::new(self.config.max_retries);
        let mut last_error = first_error.to_string();

        while state.advance() {
            let cancelled = tokio::select! {
                biased;
                () = self.cancel.cancelled() => true,
                () = tokio::time::sleep(self.config.delay) => false,
            };
            if cancelled {
                self.abandon(delivery, state, &last_error).await;
                return;
            }

            self.stats.record_retry_attempt();
            let attempt = state.attempt();
            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                result = self.deliverer.deliver(&delivery.batch_id, &delivery.envelope, attempt) => Some(result),
            };

            match result {
                None => {
                    self.abandon(delivery, state, &last_error).await;
                    return;
                }
                Some(Ok(())) => {
                    info!(batch_id = delivery.batch_id.as_str(), attempt, "Delivered batch after retry");
                    self.stats.record_delivered(delivery.entry_count);
                    return;
                }
                Some(Err(e)) => last_error = e.to_string(),
            }
        }

        let attempts = state.attempts_made();
        warn!(
            batch_id = delivery.batch_id.as_str(),
            attempts, "Giving up on batch: {last_error}"
        );
        self.persist(delivery, last_error, attempts).await;
    }

    async fn abandon(&self, delivery: PendingDelivery, state: RetryState, last_error: &str) {
        warn!(
            batch_id = delivery.batch_id.as_str(),
            "Retry chain cancelled by shutdown"
        );
        let reason = format!("{ABANDONED_REASON}: {last_error}");
        self.persist(delivery, reason, state.attempt()).await;
    }

    async fn persist(&self, delivery: PendingDelivery, reason: String, attempts: u32) {
        let entry_count = delivery.entry_count;
        let record = FailureRecord::new(delivery.envelope, reason, delivery.batch_id, attempts);

        match self.sink.append(&record).await {
            Ok(path) => {
                self.stats.record_persisted(entry_count);
                warn!(
                    batch_id = record.batch_id.as_str(),
                    entries = entry_count,
                    "Persisted undeliverable batch to {}",
                    path.display()
                );
            }
            Err(e) => {
                self.stats.record_lost(entry_count);
                error!(
                    batch_id = record.batch_id.as_str(),
                    entries = entry_count,
                    "Failed to persist undeliverable batch, entries lost: {e}"
                );
            }
        }
    }

    /// Number of retry chains still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every retry chain spawned so far has finished.
    ///
    /// Meant for callers that want a quiet point without shutting down. Safe
    /// to run alongside [`RetryController::drain`]: a close always outlives
    /// the temporary reopen here.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
        if self.closing.load(Ordering::SeqCst) {
            self.tracker.close();
        }
    }

    /// Marks the controller as finished. Running chains continue; see
    /// [`RetryController::drain`] for a bounded wait.
    pub fn close(&self) {
        self.closing.store(true, Ordering::SeqCst);
        self.tracker.close();
    }

    /// Resolves when the tracker is closed and empty. Only meaningful once
    /// nothing dispatches new batches any more.
    pub async fn wait_closed(&self) {
        self.tracker.wait().await;
    }

    /// Gives in-flight chains `grace` to finish, then cancels the rest.
    /// Cancelled chains persist their envelope before exiting. Returns the
    /// number of chains that were cancelled.
    pub async fn drain(&self, grace: Duration) -> usize {
        self.close();
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_ok() {
            return 0;
        }

        let abandoned = self.tracker.len();
        self.cancel.cancel();
        self.tracker.wait().await;
        abandoned
    }
}
