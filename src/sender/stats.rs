use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome counters shared by the consumer loop and the retry tasks.
///
/// Every submitted entry ends up counted once in `entries_delivered`,
/// `entries_persisted` or `entries_lost`.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    batches_delivered: AtomicU64,
    entries_delivered: AtomicU64,
    first_attempt_failures: AtomicU64,
    retry_attempts: AtomicU64,
    batches_persisted: AtomicU64,
    entries_persisted: AtomicU64,
    entries_lost: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliverySnapshot {
    pub batches_delivered: u64,
    pub entries_delivered: u64,
    pub first_attempt_failures: u64,
    pub retry_attempts: u64,
    pub batches_persisted: u64,
    pub entries_persisted: u64,
    pub entries_lost: u64,
}

impl DeliverySnapshot {
    /// Entries whose fate is settled, one way or another.
    pub fn entries_accounted(&self) -> u64 {
        self.entries_delivered + self.entries_persisted + self.entries_lost
    }
}

impl DeliveryStats {
    pub fn record_delivered(&self, entries: usize) {
        self.batches_delivered.fetch_add(1, Ordering::Relaxed);
        self.entries_delivered
            .fetch_add(entries as u64, Ordering::Relaxed);
    }

    pub fn record_first_attempt_failure(&self) {
        self.first_attempt_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry_attempt(&self) {
        self.retry_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persisted(&self, entries: usize) {
        self.batches_persisted.fetch_add(1, Ordering::Relaxed);
        self.entries_persisted
            .fetch_add(entries as u64, Ordering::Relaxed);
    }

    pub fn record_lost(&self, entries: usize) {
        self.entries_lost.fetch_add(entries as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DeliverySnapshot {
        DeliverySnapshot {
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            entries_delivered: self.entries_delivered.load(Ordering::Relaxed),
            first_attempt_failures: self.first_attempt_failures.load(Ordering::Relaxed),
            retry_attempts: self.retry_attempts.load(Ordering::Relaxed),
            batches_persisted: self.batches_persisted.load(Ordering::Relaxed),
            entries_persisted: self.entries_persisted.load(Ordering::Relaxed),
            entries_lost: self.entries_lost.load(Ordering::Relaxed),
        }
    }
}
