pub mod batch;
pub mod queue;

pub use batch::{Batch, BatchAccumulator, BatchConfig, FlushTrigger};
pub use queue::{BufferError, DEFAULT_CHANNEL_CAPACITY, IngestReceiver, IngestSender, ingest_channel};
