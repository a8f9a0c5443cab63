use super::client::{ClientError, HttpClient};
use super::envelope::DeliveryEnvelope;
use crate::buffer::Batch;
use std::time::Instant;
use tracing::{debug, warn};

/// Encodes batches and performs single delivery attempts.
///
/// Retrying is not its concern; see `reliability::RetryController`.
#[derive(Debug, Clone)]
pub struct Deliverer {
    client: HttpClient,
    compress_threshold: usize,
}

impl Deliverer {
    pub fn new(client: HttpClient, compress_threshold: usize) -> Self {
        Self {
            client,
            compress_threshold,
        }
    }

    pub fn prepare(&self, batch: &Batch) -> DeliveryEnvelope {
        DeliveryEnvelope::for_batch(batch, self.compress_threshold)
    }

    /// One POST of `envelope`. Any transport, body or collector-code failure
    /// is returned as an error for the caller to retry.
    pub async fn deliver(
        &self,
        batch_id: &str,
        envelope: &DeliveryEnvelope,
        attempt: u32,
    ) -> Result<(), ClientError> {
        let start = Instant::now();
        let result = self.client.collect_log(envelope).await;

        match &result {
            Ok(()) => debug!(
                batch_id,
                attempt,
                kind = ?envelope.kind(),
                "Delivered batch in {:?}",
                start.elapsed()
            ),
            Err(e) => warn!(batch_id, attempt, "Delivery attempt failed: {e}"),
        }
        result
    }
}
