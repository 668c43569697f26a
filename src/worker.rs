//! `Worker<T>`: drains a queue, coalesces batches, publishes with retry,
//! and logs partial failures.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{PublishError, QueueError, SinkError};
use crate::queue::Queue;
use crate::retry::{execute_with_retry, ResiliencePolicy};
use crate::sink::{PublishEntry, PublishOutcome, Sink};

/// Maximum number of events coalesced into one publish call.
pub const MAX_BATCH_SIZE: usize = 10;

/// The long-lived drain/publish loop for one event type.
///
/// Constructed, then handed to [`crate::host::WorkerHandle::start`], which
/// spawns [`Worker::run`] as a background task under a linked cancellation
/// token.
pub struct Worker<T> {
    queue: Queue<T>,
    topic_id: String,
    sink: Arc<dyn Sink>,
    policy: Arc<dyn ResiliencePolicy>,
}

impl<T: Serialize + Send + 'static> Worker<T> {
    pub fn new(
        queue: Queue<T>,
        topic_id: impl Into<String>,
        sink: Arc<dyn Sink>,
        policy: Arc<dyn ResiliencePolicy>,
    ) -> Self {
        Worker {
            queue,
            topic_id: topic_id.into(),
            sink,
            policy,
        }
    }

    /// Run the drain loop until the queue reaches end-of-stream or `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let reader = self.queue.reader();
        let mut buf: Vec<T> = Vec::with_capacity(MAX_BATCH_SIZE);

        loop {
            match reader.wait_to_read(&cancel).await {
                Ok(()) => {}
                Err(QueueError::Cancelled) => {
                    tracing::info!("worker cancelled while waiting for events");
                    break;
                }
                Err(QueueError::Closed) => unreachable!("wait_to_read never returns Closed"),
            }

            if buf.is_empty() && reader.is_at_end_of_stream() {
                tracing::info!("queue drained and closed, stopping worker");
                break;
            }

            while let Some(item) = reader.try_read() {
                buf.push(item);
                if buf.len() == MAX_BATCH_SIZE || !reader.try_peek() {
                    self.publish(&mut buf, &cancel).await;
                }
            }
        }

        if !buf.is_empty() {
            tracing::warn!(
                count = buf.len(),
                "worker stopped with unpublished events still buffered"
            );
        }
    }

    /// Serialize, publish (with retry), and log the outcome of one batch.
    /// `buf` is always empty when this returns.
    async fn publish(&self, buf: &mut Vec<T>, cancel: &CancellationToken) {
        let batch_size = buf.len();
        match self.try_publish(buf, cancel).await {
            Ok(outcome) => {
                if !outcome.successful.is_empty() {
                    tracing::debug!(
                        count = outcome.successful.len(),
                        "published events successfully"
                    );
                }
                for failed in &outcome.failed {
                    tracing::error!(
                        id = %failed.id,
                        code = %failed.code,
                        message = %failed.message,
                        "failed to publish event"
                    );
                }
            }
            Err(PublishError::Serialization(err)) => {
                tracing::error!(error = %err, batch_size, "failed to serialize event; dropping batch");
            }
            Err(PublishError::Sink(SinkError::Cancelled)) => {
                tracing::info!(batch_size, "publish cancelled during shutdown");
            }
            Err(PublishError::Sink(err)) => {
                tracing::error!(error = %err, batch_size, "failed to publish batch; dropping batch");
            }
        }

        buf.clear();
    }

    /// Build the publish request and send it, retrying transient sink
    /// failures. Serialization failure fails the whole batch.
    async fn try_publish(
        &self,
        buf: &[T],
        cancel: &CancellationToken,
    ) -> Result<PublishOutcome, PublishError> {
        let mut entries = Vec::with_capacity(buf.len());
        for (i, event) in buf.iter().enumerate() {
            entries.push(PublishEntry {
                id: i.to_string(),
                message: serde_json::to_string(event)?,
            });
        }

        let outcome = execute_with_retry(self.policy.as_ref(), cancel, || {
            self.sink.publish_batch(&self.topic_id, &entries, cancel)
        })
        .await?;

        Ok(outcome)
    }
}
