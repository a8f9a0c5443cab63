use crate::domain::FormattedEntry;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;
pub const DEFAULT_MAX_BATCH_LENGTH: usize = 50_000;

/// What sealed a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlushTrigger {
    EntryCount,
    ByteLength,
    Timer,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub max_size: usize,
    pub max_length: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_BATCH_SIZE,
            max_length: DEFAULT_MAX_BATCH_LENGTH,
        }
    }
}

/// A sealed group of entries handed to the deliverer in one piece.
#[derive(Debug, Clone)]
pub struct Batch {
    id: String,
    entries: Vec<FormattedEntry>,
    total_length: usize,
    trigger: FlushTrigger,
}

impl Batch {
    pub fn new(entries: Vec<FormattedEntry>, trigger: FlushTrigger) -> Self {
        let total_length = entries.iter().map(String::len).sum();
        Self {
            id: Uuid::new_v4().to_string(),
            entries,
            total_length,
            trigger,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[FormattedEntry] {
        &self.entries
    }

    /// Sum of entry lengths in bytes.
    pub fn total_length(&self) -> usize {
        self.total_length
    }

    pub fn trigger(&self) -> FlushTrigger {
        self.trigger
    }
}

/// Pending entries of one transport.
///
/// Owned by the consumer loop alone, so appends and flushes never interleave.
/// `pending_length` always equals the summed length of `pending`.
#[derive(Debug)]
pub struct BatchAccumulator {
    config: BatchConfig,
    pending: Vec<FormattedEntry>,
    pending_length: usize,
}

impl BatchAccumulator {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            pending: Vec::with_capacity(config.max_size.min(1024)),
            config,
            pending_length: 0,
        }
    }

    /// Appends an entry and seals the batch as soon as either threshold is
    /// reached.
    pub fn push(&mut self, entry: FormattedEntry) -> Option<Batch> {
        self.pending_length += entry.len();
        self.pending.push(entry);

        if self.pending.len() >= self.config.max_size {
            self.flush(FlushTrigger::EntryCount)
        } else if self.pending_length >= self.config.max_length {
            self.flush(FlushTrigger::ByteLength)
        } else {
            None
        }
    }

    /// Seals whatever is pending. Returns `None` for an empty accumulator.
    pub fn flush(&mut self, trigger: FlushTrigger) -> Option<Batch> {
        if self.pending.is_empty() {
            return None;
        }

        let capacity = self.config.max_size.min(1024);
        let entries = std::mem::replace(&mut self.pending, Vec::with_capacity(capacity));
        let total_length = std::mem::take(&mut self.pending_length);

        let batch = Batch::new(entries, trigger);
        debug_assert_eq!(batch.total_length(), total_length);
        Some(batch)
    }

    /// New limits apply from the next push; a batch already over them is
    /// sealed then.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.config.max_size = max_size.max(1);
    }

    pub fn set_max_length(&mut self, max_length: usize) {
        self.config.max_length = max_length.max(1);
    }

    pub fn pending_length(&self) -> usize {
        self.pending_length
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
