use crate::buffer::{Batch, BatchAccumulator, BatchConfig, FlushTrigger, IngestReceiver};
use crate::reliability::{DispatchOutcome, RetryController};
use futures::FutureExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runtime adjustments sent from the transport handle to its consumer loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlMessage {
    FlushInterval(Duration),
    MaxBatchSize(usize),
    MaxBatchLength(usize),
}

pub(crate) struct ConsumerLoopParams {
    pub receiver: IngestReceiver,
    pub control_rx: mpsc::UnboundedReceiver<ControlMessage>,
    pub shutdown: CancellationToken,
    pub retries: RetryController,
    pub batch_config: BatchConfig,
    pub flush_interval: Duration,
}

/// The single owner of a transport's pending batch.
///
/// Services timer ticks, control messages and channel arrivals from one
/// `select!`, so batch state needs no locking. Returns the number of entries
/// flushed while shutting down.
pub(crate) async fn run_consumer_loop(params: ConsumerLoopParams) -> usize {
    let ConsumerLoopParams {
        receiver,
        mut control_rx,
        shutdown,
        retries,
        batch_config,
        flush_interval,
    } = params;

    info!(
        max_batch_size = batch_config.max_size,
        max_batch_length = batch_config.max_length,
        "Starting consumer loop (flush_interval={:?})",
        flush_interval
    );

    let mut accumulator = BatchAccumulator::new(batch_config);
    let mut ticker = flush_ticker(flush_interval);
    let mut flushed_on_shutdown = 0;

    // One receive future lives across iterations; dropping a pending one
    // could lose an entry already handed to it.
    let recv = receiver.recv();
    tokio::pin!(recv);

    loop {
        tokio::select! {
            biased;

            () = shutdown.cancelled() => {
                if let Some(Some(entry)) = recv.as_mut().now_or_never() {
                    flushed_on_shutdown += push_entry(&mut accumulator, entry, &retries).await;
                }
                flushed_on_shutdown += drain_queued(&receiver, &mut accumulator, &retries).await;
                break;
            }

            Some(message) = control_rx.recv() => {
                apply_control(message, &mut accumulator, &mut ticker);
            }

            _ = ticker.tick() => {
                if let Some(batch) = accumulator.flush(FlushTrigger::Timer) {
                    flush(&retries, batch).await;
                }
            }

            received = &mut recv => {
                let Some(entry) = received else {
                    // Every producer handle is gone.
                    if let Some(batch) = accumulator.flush(FlushTrigger::Shutdown) {
                        flushed_on_shutdown += batch.size();
                        flush(&retries, batch).await;
                    }
                    break;
                };
                recv.set(receiver.recv());

                if let Some(batch) = accumulator.push(entry) {
                    flush(&retries, batch).await;
                }
            }
        }
    }

    receiver.close();
    info!("Consumer loop stopped");
    flushed_on_shutdown
}

fn flush_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

fn apply_control(message: ControlMessage, accumulator: &mut BatchAccumulator, ticker: &mut Interval) {
    debug!(?message, "Applying transport setting");
    match message {
        ControlMessage::FlushInterval(period) => *ticker = flush_ticker(period),
        ControlMessage::MaxBatchSize(size) => accumulator.set_max_size(size),
        ControlMessage::MaxBatchLength(length) => accumulator.set_max_length(length),
    }
}

async fn flush(retries: &RetryController, batch: Batch) {
    let batch_id = batch.id().to_string();
    let entries = batch.size();
    let trigger = batch.trigger();

    match retries.dispatch(batch).await {
        DispatchOutcome::Delivered => {
            debug!(batch_id = batch_id.as_str(), entries, ?trigger, "Flushed batch");
        }
        DispatchOutcome::Retrying => {
            debug!(batch_id = batch_id.as_str(), entries, ?trigger, "Flushed batch, retrying in background");
        }
    }
}

async fn push_entry(
    accumulator: &mut BatchAccumulator,
    entry: String,
    retries: &RetryController,
) -> usize {
    match accumulator.push(entry) {
        Some(batch) => {
            let entries = batch.size();
            flush(retries, batch).await;
            entries
        }
        None => 0,
    }
}

/// Moves everything already queued into batches and flushes the remainder.
async fn drain_queued(
    receiver: &IngestReceiver,
    accumulator: &mut BatchAccumulator,
    retries: &RetryController,
) -> usize {
    let mut flushed = 0;
    while let Some(entry) = receiver.try_recv() {
        flushed += push_entry(accumulator, entry, retries).await;
    }
    if let Some(batch) = accumulator.flush(FlushTrigger::Shutdown) {
        flushed += batch.size();
        flush(retries, batch).await;
    }
    flushed
}
