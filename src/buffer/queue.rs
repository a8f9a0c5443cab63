use crate::domain::FormattedEntry;
use thiserror::Error;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BufferError {
    #[error("Invalid channel capacity: {0}")]
    InvalidCapacity(usize),
    #[error("Ingest channel is closed")]
    Closed,
}

/// Creates the bounded FIFO between producers and the batch consumer.
///
/// A full channel makes producers wait; entries are never dropped here.
pub fn ingest_channel(capacity: usize) -> Result<(IngestSender, IngestReceiver), BufferError> {
    // Zero would turn the queue into a rendezvous channel.
    if capacity == 0 {
        return Err(BufferError::InvalidCapacity(capacity));
    }

    let (sender, receiver) = kanal::bounded::<FormattedEntry>(capacity);
    Ok((
        IngestSender { inner: sender },
        IngestReceiver {
            inner: receiver.to_async(),
        },
    ))
}

/// Producer handle. Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct IngestSender {
    inner: kanal::Sender<FormattedEntry>,
}

impl IngestSender {
    /// Enqueues an entry, blocking the calling thread while the channel is full.
    pub fn submit(&self, entry: FormattedEntry) -> Result<(), BufferError> {
        self.inner.send(entry).map_err(|_| BufferError::Closed)
    }

    /// Enqueues an entry, suspending the calling task while the channel is full.
    pub async fn submit_async(&self, entry: FormattedEntry) -> Result<(), BufferError> {
        self.inner
            .as_async()
            .send(entry)
            .await
            .map_err(|_| BufferError::Closed)
    }
}

impl std::fmt::Debug for IngestSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestSender")
            .field("pending", &self.inner.len())
            .finish()
    }
}

/// The single consumer side, owned by the batch loop.
pub struct IngestReceiver {
    inner: kanal::AsyncReceiver<FormattedEntry>,
}

impl IngestReceiver {
    /// Waits for the next entry. `None` once every sender is gone or the
    /// channel was closed and drained.
    pub async fn recv(&self) -> Option<FormattedEntry> {
        self.inner.recv().await.ok()
    }

    /// Takes an entry only if one is already queued.
    pub fn try_recv(&self) -> Option<FormattedEntry> {
        self.inner.try_recv().ok().flatten()
    }

    /// Closes both sides. Queued entries are discarded and blocked producers
    /// get [`BufferError::Closed`], so drain with `try_recv` first.
    pub fn close(&self) {
        let _ = self.inner.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            ingest_channel(0).err(),
            Some(BufferError::InvalidCapacity(0))
        );
    }

    #[tokio::test]
    async fn test_entries_arrive_in_fifo_order() {
        let (sender, receiver) = ingest_channel(8).unwrap();
        for i in 0..5 {
            sender.submit(format!("entry-{i}")).unwrap();
        }
        for i in 0..5 {
            assert_eq!(receiver.recv().await.unwrap(), format!("entry-{i}"));
        }
        assert!(receiver.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_recv_ends_when_senders_dropped() {
        let (sender, receiver) = ingest_channel(4).unwrap();
        sender.submit_async("last".to_string()).await.unwrap();
        drop(sender);

        assert_eq!(receiver.recv().await.as_deref(), Some("last"));
        assert!(receiver.recv().await.is_none());
    }
}
