//! In-process [`Sink`] test double, available behind the `test-util` feature.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::SinkError;
use crate::sink::{PublishEntry, PublishOutcome, Sink};

/// Records every batch it receives and returns canned responses in order,
/// falling back to an empty success once the queue of responses is drained.
///
/// ```
/// use sns_events::testing::MockSink;
/// use sns_events::sink::PublishOutcome;
///
/// let sink = MockSink::new();
/// sink.push_response(Ok(PublishOutcome::default()));
/// ```
#[derive(Clone, Default)]
pub struct MockSink {
    responses: Arc<Mutex<VecDeque<Result<PublishOutcome, SinkError>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

/// One recorded call to [`MockSink::publish_batch`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub topic: String,
    pub entries: Vec<PublishEntry>,
}

impl MockSink {
    pub fn new() -> Self {
        MockSink::default()
    }

    /// Queue the next response `publish_batch` will return, in FIFO order.
    pub fn push_response(&self, response: Result<PublishOutcome, SinkError>) {
        self.responses.lock().push_back(response);
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Total number of events across every recorded call.
    pub fn total_events(&self) -> usize {
        self.calls.lock().iter().map(|c| c.entries.len()).sum()
    }
}

#[async_trait]
impl Sink for MockSink {
    async fn publish_batch(
        &self,
        topic: &str,
        entries: &[PublishEntry],
        _cancel: &CancellationToken,
    ) -> Result<PublishOutcome, SinkError> {
        self.calls.lock().push(RecordedCall {
            topic: topic.to_string(),
            entries: entries.to_vec(),
        });

        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(PublishOutcome::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{FailedEntry, SuccessEntry};

    #[tokio::test]
    async fn records_calls_and_replays_canned_responses_in_order() {
        let sink = MockSink::new();
        sink.push_response(Ok(PublishOutcome {
            successful: vec![SuccessEntry {
                id: "0".into(),
                message_id: "m-1".into(),
            }],
            failed: vec![],
        }));
        sink.push_response(Err(SinkError::Throttled));

        let cancel = CancellationToken::new();
        let entries = vec![PublishEntry {
            id: "0".into(),
            message: "{}".into(),
        }];

        let first = sink.publish_batch("topic-a", &entries, &cancel).await;
        assert!(first.is_ok());
        let second = sink.publish_batch("topic-a", &entries, &cancel).await;
        assert!(matches!(second, Err(SinkError::Throttled)));

        assert_eq!(sink.calls().len(), 2);
        assert_eq!(sink.total_events(), 2);
    }

    #[tokio::test]
    async fn unqueued_calls_default_to_an_empty_success() {
        let sink = MockSink::new();
        let cancel = CancellationToken::new();
        let outcome = sink.publish_batch("topic-a", &[], &cancel).await.unwrap();
        assert!(outcome.successful.is_empty());
        assert!(outcome.failed.is_empty());
    }

    #[test]
    fn failed_entry_is_constructible_for_canned_partial_failure() {
        let _ = FailedEntry {
            id: "1".into(),
            code: "InvalidParameter".into(),
            message: "bad".into(),
        };
    }
}
