//! Worker lifecycle: spawning, graceful shutdown, and aggregation.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::worker::Worker;

/// Grace period a [`WorkerHandle`] waits for its worker to finish draining
/// before abandoning the join and returning control to the caller.
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// A running [`Worker`] task plus the handle needed to stop it.
pub struct WorkerHandle {
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Spawn `worker` as a background task, linked to `parent` so that
    /// cancelling `parent` also cancels this worker.
    pub fn start<T>(worker: Worker<T>, parent: &CancellationToken) -> Self
    where
        T: serde::Serialize + Send + 'static,
    {
        let cancel = parent.child_token();
        let run_token = cancel.clone();
        let join = tokio::spawn(async move {
            worker.run(run_token).await;
        });
        WorkerHandle {
            cancel,
            join: Some(join),
        }
    }

    /// Request shutdown and wait up to [`SHUTDOWN_GRACE_PERIOD`] for the
    /// worker to finish draining. If `cancel` fires first, the join is
    /// abandoned (the worker's own task keeps running to completion
    /// independently; this handle simply stops waiting on it).
    pub async fn stop(&mut self, cancel: &CancellationToken) {
        self.cancel.cancel();
        let Some(join) = self.join.take() else {
            return;
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!("shutdown cancelled while waiting for worker to drain");
            }
            result = tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, join) => {
                match result {
                    Ok(Ok(())) => tracing::info!("worker stopped cleanly"),
                    Ok(Err(err)) => tracing::error!(error = %err, "worker task panicked"),
                    Err(_) => tracing::error!("worker did not stop within the shutdown grace period"),
                }
            }
        }
    }
}

/// Aggregates every running [`WorkerHandle`] in a process and stops them
/// together, last-started-first, on shutdown.
#[derive(Default)]
pub struct Host {
    handles: Vec<WorkerHandle>,
}

impl Host {
    pub fn new() -> Self {
        Host::default()
    }

    /// Start `worker` under `parent` and track its handle.
    pub fn spawn<T>(&mut self, worker: Worker<T>, parent: &CancellationToken)
    where
        T: serde::Serialize + Send + 'static,
    {
        self.handles.push(WorkerHandle::start(worker, parent));
    }

    /// Stop every tracked worker, most-recently-started first, each
    /// racing the shared `cancel` against its own shutdown grace period.
    pub async fn stop_all(&mut self, cancel: &CancellationToken) {
        while let Some(mut handle) = self.handles.pop() {
            handle.stop(cancel).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::Queue;
    use crate::retry::DefaultResiliencePolicy;
    use crate::sink::{PublishEntry, PublishOutcome, Sink};
    use async_trait::async_trait;
    use serde::Serialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::{sleep, timeout, Duration as TokioDuration};

    #[derive(Serialize)]
    struct Event {
        id: u32,
    }

    struct CountingSink {
        batches: AtomicUsize,
    }

    #[async_trait]
    impl Sink for CountingSink {
        async fn publish_batch(
            &self,
            _topic: &str,
            _entries: &[PublishEntry],
            _cancel: &CancellationToken,
        ) -> Result<PublishOutcome, crate::error::SinkError> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            Ok(PublishOutcome::default())
        }
    }

    #[tokio::test]
    async fn handle_stops_promptly_once_the_queue_is_closed() {
        let sink = Arc::new(CountingSink {
            batches: AtomicUsize::new(0),
        });
        let queue = Queue::<Event>::bounded(10);
        let parent = CancellationToken::new();
        let worker = Worker::new(
            queue.clone(),
            "arn:aws:sns:us-east-1:000000000000:events",
            sink.clone(),
            Arc::new(DefaultResiliencePolicy::default()),
        );
        let mut handle = WorkerHandle::start(worker, &parent);

        let cancel = CancellationToken::new();
        queue.write(Event { id: 1 }, &cancel).await.unwrap();
        queue.close();

        let stop_cancel = CancellationToken::new();
        timeout(TokioDuration::from_secs(1), handle.stop(&stop_cancel))
            .await
            .expect("stop should return promptly");
        assert_eq!(sink.batches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn host_stops_every_worker_in_reverse_start_order() {
        let sink = Arc::new(CountingSink {
            batches: AtomicUsize::new(0),
        });
        let parent = CancellationToken::new();
        let mut host = Host::new();

        for _ in 0..3 {
            let queue = Queue::<Event>::bounded(10);
            queue.close();
            let worker = Worker::new(
                queue,
                "arn:aws:sns:us-east-1:000000000000:events",
                sink.clone(),
                Arc::new(DefaultResiliencePolicy::default()),
            );
            host.spawn(worker, &parent);
        }

        sleep(TokioDuration::from_millis(20)).await;
        let cancel = CancellationToken::new();
        timeout(TokioDuration::from_secs(1), host.stop_all(&cancel))
            .await
            .expect("host shutdown should complete promptly");
        assert!(host.handles.is_empty());
    }
}
