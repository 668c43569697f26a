//! Typed event dispatch to a topic-based notification sink
//!
//! Producers raise strongly-typed events through a [`Raiser`]; each
//! registered event type drains through its own backpressured [`Queue`],
//! coalesces into batches of up to ten, and publishes them to a
//! [`Sink`] (an AWS SNS-shaped HTTP endpoint by default) with retry on
//! transient failure.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sns_events::{EventTypeConfig, Host, Raiser, Worker};
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(serde::Serialize)]
//! struct OrderCreated {
//!     order_id: String,
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EventTypeConfig::builder("arn:aws:sns:us-east-1:000000000000:orders").build();
//! let queue = config.build_queue::<OrderCreated>();
//!
//! let raiser = Raiser::new();
//! raiser.register_channel(queue.clone());
//!
//! let sink = std::sync::Arc::new(sns_events::sink::HttpSink::new(
//!     "https://example.invalid/publish",
//!     std::time::Duration::from_secs(5),
//! )?);
//! let worker = Worker::new(queue, "arn:aws:sns:us-east-1:000000000000:orders", sink, config.resiliency_policy());
//!
//! let lifecycle = CancellationToken::new();
//! let mut host = Host::new();
//! host.spawn(worker, &lifecycle);
//!
//! let cancel = CancellationToken::new();
//! raiser
//!     .raise_event(OrderCreated { order_id: "ORD-1".into() }, &cancel)
//!     .await?;
//!
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod host;
mod queue;
mod raiser;
mod retry;
pub mod sink;
mod worker;

#[cfg(feature = "test-util")]
pub mod testing;

pub use config::{EventTypeConfig, EventTypeConfigBuilder, EventTypeSettings};
pub use error::{PublishError, QueueError, RaiserError, SinkError};
pub use host::{Host, WorkerHandle};
pub use queue::{Queue, Reader};
pub use raiser::Raiser;
pub use retry::{DefaultResiliencePolicy, JitterMode, ResiliencePolicy};
pub use worker::{Worker, MAX_BATCH_SIZE};

#[cfg(all(test, feature = "test-util"))]
mod end_to_end_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde::{Deserialize, Serialize};
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    use crate::testing::MockSink;
    use crate::{EventTypeConfig, Host, Raiser};

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct OrderCreated {
        order_id: String,
    }

    #[tokio::test]
    async fn raised_events_reach_the_sink_through_the_full_pipeline() {
        let config =
            EventTypeConfig::builder("arn:aws:sns:us-east-1:000000000000:order-events-topic")
                .build();
        let queue = config.build_queue::<OrderCreated>();

        let raiser = Raiser::new();
        raiser.register_channel(queue.clone());

        let sink = Arc::new(MockSink::new());
        let worker = crate::Worker::new(
            queue.clone(),
            "arn:aws:sns:us-east-1:000000000000:order-events-topic",
            sink.clone(),
            config.resiliency_policy(),
        );

        let lifecycle = CancellationToken::new();
        let mut host = Host::new();
        host.spawn(worker, &lifecycle);

        let cancel = CancellationToken::new();
        for i in 0..3 {
            raiser
                .raise_event(
                    OrderCreated {
                        order_id: format!("ORD-{i}"),
                    },
                    &cancel,
                )
                .await
                .unwrap();
        }
        queue.close();

        timeout(Duration::from_secs(1), host.stop_all(&cancel))
            .await
            .expect("shutdown should complete once the queue drains");

        assert_eq!(sink.total_events(), 3);
    }
}
