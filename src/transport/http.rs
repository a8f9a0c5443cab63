use super::pipeline::{ConsumerLoopParams, ControlMessage, run_consumer_loop};
use crate::app::Config;
use crate::buffer::{BatchConfig, BufferError, IngestSender, ingest_channel};
use crate::domain::{FormattedEntry, Level, LogRecord, RemoteLogError};
use crate::reliability::{FailureSink, RetryConfig, RetryController};
use crate::sender::{ClientConfig, Deliverer, DeliverySnapshot, DeliveryStats, HttpClient};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);
const WORKER_THREAD_NAME: &str = "remote-log-worker";

/// What [`HttpTransport::shutdown`] managed to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Entries flushed by the final drain of the ingest channel.
    pub flushed_entries: usize,
    /// Retry chains cancelled after the grace period; their batches were
    /// handed to the failure sink.
    pub abandoned_retries: usize,
}

/// Batches records and ships them to the collector.
///
/// The consumer loop and the retry chains it starts run on a dedicated
/// thread with its own current-thread runtime. Producers only touch the
/// bounded ingest channel, blocking while it is full; since nothing they
/// block can be the consumer, a full channel always drains eventually.
pub struct HttpTransport {
    levels: Vec<Level>,
    sender: IngestSender,
    control_tx: mpsc::UnboundedSender<ControlMessage>,
    shutdown: CancellationToken,
    worker: Mutex<Option<Worker>>,
    retries: RetryController,
    stats: Arc<DeliveryStats>,
    shutdown_grace: Duration,
    failure_log_dir: PathBuf,
}

impl HttpTransport {
    /// Starts the worker thread. Works with or without an ambient runtime.
    pub fn new(
        config: &Config,
        levels: impl IntoIterator<Item = Level>,
    ) -> Result<Self, RemoteLogError> {
        config.validate()?;

        let client = HttpClient::new(ClientConfig::from(config))?;
        let sink = FailureSink::new(&config.error_log_dir);
        sink.ensure_dir()?;

        let stats = Arc::new(DeliveryStats::default());
        let retries = RetryController::new(
            Deliverer::new(client, config.compress_threshold),
            sink,
            RetryConfig {
                max_retries: config.max_retries,
                delay: config.retry_delay(),
            },
            Arc::clone(&stats),
        );

        let (sender, receiver) = ingest_channel(config.channel_capacity)?;
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let worker = Worker::spawn(
            ConsumerLoopParams {
                receiver,
                control_rx,
                shutdown: shutdown.clone(),
                retries: retries.clone(),
                batch_config: BatchConfig {
                    max_size: config.max_batch_size,
                    max_length: config.max_batch_length,
                },
                flush_interval: config.flush_interval(),
            },
            retries.clone(),
        )?;

        Ok(Self {
            levels: levels.into_iter().collect(),
            sender,
            control_tx,
            shutdown,
            worker: Mutex::new(Some(worker)),
            retries,
            stats,
            shutdown_grace: config.shutdown_grace(),
            failure_log_dir: config.error_log_dir.clone(),
        })
    }

    pub fn should_log(&self, level: Level) -> bool {
        self.levels.contains(&level)
    }

    /// Formats and enqueues a record. Fire-and-forget: delivery problems are
    /// handled by the pipeline, never reported to the caller.
    pub fn log(&self, record: &LogRecord) {
        if let Err(e) = self.submit(record.format_entry()) {
            warn!("Dropping log record: {e}");
        }
    }

    /// Blocks the calling thread while the ingest channel is full.
    ///
    /// Safe from any thread, runtime workers included: the consumer never
    /// shares a thread with a producer. Async callers that must not stall a
    /// worker should prefer [`HttpTransport::submit_async`].
    pub fn submit(&self, entry: FormattedEntry) -> Result<(), BufferError> {
        if self.shutdown.is_cancelled() {
            return Err(BufferError::Closed);
        }
        self.sender.submit(entry)
    }

    /// Suspends the calling task while the ingest channel is full.
    pub async fn submit_async(&self, entry: FormattedEntry) -> Result<(), BufferError> {
        if self.shutdown.is_cancelled() {
            return Err(BufferError::Closed);
        }
        self.sender.submit_async(entry).await
    }

    /// Restarts the flush timer; the first tick under the new interval fires
    /// one full interval later.
    pub fn set_flush_interval(&self, interval: Duration) {
        self.send_control(ControlMessage::FlushInterval(
            interval.max(MIN_FLUSH_INTERVAL),
        ));
    }

    pub fn set_max_batch_size(&self, max_size: usize) {
        self.send_control(ControlMessage::MaxBatchSize(max_size));
    }

    pub fn set_max_batch_length(&self, max_length: usize) {
        self.send_control(ControlMessage::MaxBatchLength(max_length));
    }

    fn send_control(&self, message: ControlMessage) {
        if self.control_tx.send(message).is_err() {
            warn!(?message, "Consumer loop has stopped, setting ignored");
        }
    }

    pub fn stats(&self) -> DeliverySnapshot {
        self.stats.snapshot()
    }

    /// Retry chains currently running in the background.
    pub fn pending_retries(&self) -> usize {
        self.retries.in_flight()
    }

    /// Resolves once every retry chain started so far has finished.
    pub async fn wait_for_retries(&self) {
        self.retries.wait_idle().await;
    }

    pub fn failure_log_dir(&self) -> &Path {
        &self.failure_log_dir
    }

    /// Stops intake, flushes what is queued and waits up to the configured
    /// grace period for retry chains. Safe to call more than once.
    pub async fn shutdown(&self) -> ShutdownReport {
        self.shutdown.cancel();

        let worker = self.worker.lock().take();
        let Some(Worker { flushed, thread }) = worker else {
            let abandoned_retries = self.retries.drain(self.shutdown_grace).await;
            return ShutdownReport {
                flushed_entries: 0,
                abandoned_retries,
            };
        };

        let flushed_entries = match flushed.await {
            Ok(flushed) => flushed,
            Err(_) => {
                error!("Consumer loop terminated abnormally");
                0
            }
        };

        let abandoned_retries = self.retries.drain(self.shutdown_grace).await;
        join_worker(thread).await;
        info!(
            flushed_entries,
            abandoned_retries, "HTTP transport shut down"
        );

        ShutdownReport {
            flushed_entries,
            abandoned_retries,
        }
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        // The worker still flushes its last batch and lets running retry
        // chains finish before its thread exits.
        self.shutdown.cancel();
        self.retries.close();
    }
}

/// The dedicated delivery thread.
struct Worker {
    flushed: oneshot::Receiver<usize>,
    thread: JoinHandle<()>,
}

impl Worker {
    fn spawn(
        params: ConsumerLoopParams,
        retries: RetryController,
    ) -> Result<Self, RemoteLogError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(RemoteLogError::Worker)?;
        let (flushed_tx, flushed) = oneshot::channel();

        let thread = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    let flushed_entries = run_consumer_loop(params).await;
                    let _ = flushed_tx.send(flushed_entries);
                    // Retry chains were spawned onto this runtime.
                    retries.wait_closed().await;
                });
            })
            .map_err(RemoteLogError::Worker)?;

        Ok(Self { flushed, thread })
    }
}

async fn join_worker(thread: JoinHandle<()>) {
    match tokio::task::spawn_blocking(move || thread.join()).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => error!("Delivery worker thread panicked"),
        Err(e) => error!("Failed to join delivery worker thread: {e}"),
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("levels", &self.levels)
            .field("sender", &self.sender)
            .field("failure_log_dir", &self.failure_log_dir)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
