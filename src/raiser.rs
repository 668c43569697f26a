//! The channel directory: routes a typed event to its registered queue.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::{QueueError, RaiserError};
use crate::queue::Queue;

/// Why [`Raiser::route`] could not find a concrete queue for `T`.
///
/// Internal to this module: neither arm reaches a caller as an `Err` (see
/// [`RaiserError`]'s doc comment).
enum RouteFailure {
    NoChannel,
    Mismatch,
}

/// Directory from event type to queue, plus the producer-facing write API.
///
/// Cheaply cloneable — clones share the same directory, so a `Raiser` handle
/// can be passed freely to every producer in the process.
#[derive(Clone, Default)]
pub struct Raiser {
    directory: std::sync::Arc<RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>>,
}

impl Raiser {
    /// Create an empty raiser. Channels are added with [`Raiser::register_channel`].
    pub fn new() -> Self {
        Raiser::default()
    }

    /// Install `queue` as the channel for event type `T`.
    ///
    /// Idempotent: registering the same type twice replaces the previous
    /// queue, and the later registration wins.
    pub fn register_channel<T: Send + 'static>(&self, queue: Queue<T>) {
        self.directory
            .write()
            .insert(TypeId::of::<T>(), Box::new(queue));
        tracing::info!(event_type = std::any::type_name::<T>(), "registered event channel");
    }

    fn route<T: Send + 'static>(&self) -> Result<Queue<T>, RouteFailure> {
        let directory = self.directory.read();
        let boxed = directory
            .get(&TypeId::of::<T>())
            .ok_or(RouteFailure::NoChannel)?;
        boxed
            .downcast_ref::<Queue<T>>()
            .cloned()
            .ok_or(RouteFailure::Mismatch)
    }

    /// Route `event` to its registered queue and write it.
    ///
    /// Returns `false` (logging a warning) if no channel is registered for
    /// `T`, or (logging an error) if the registered entry's type doesn't
    /// match — a defensive check that should be unreachable given the
    /// `TypeId` key, since the map is built from type-erased trait objects.
    /// `Ok(true)`/`Ok(false)` otherwise mirrors [`Queue::write`]'s result;
    /// an `Err` means the caller's cancellation signal fired.
    pub async fn raise_event<T: Send + 'static>(
        &self,
        event: T,
        cancel: &CancellationToken,
    ) -> Result<bool, QueueError> {
        match self.route::<T>() {
            Ok(queue) => queue.write(event, cancel).await,
            Err(RouteFailure::NoChannel) => {
                tracing::warn!(
                    event_type = std::any::type_name::<T>(),
                    "no channel registered for event type; dropping event"
                );
                Ok(false)
            }
            Err(RouteFailure::Mismatch) => {
                tracing::error!(
                    event_type = std::any::type_name::<T>(),
                    error = %RaiserError::MisconfiguredChannel,
                    "dropping event"
                );
                Ok(false)
            }
        }
    }

    /// Rejects an absent event up front with `RaiserError::NullArgument`,
    /// then routes it exactly like [`Raiser::raise_event`].
    pub async fn raise_optional_event<T: Send + 'static>(
        &self,
        event: Option<T>,
        cancel: &CancellationToken,
    ) -> Result<bool, crate::error::RaiserError> {
        let event = event.ok_or(crate::error::RaiserError::NullArgument("event"))?;
        Ok(self.raise_event(event, cancel).await.unwrap_or(false))
    }

    /// Route a sequence of events to their registered queue, preserving order.
    pub async fn raise_events<T: Send + 'static>(
        &self,
        events: impl IntoIterator<Item = T>,
        cancel: &CancellationToken,
    ) -> Result<bool, QueueError> {
        match self.route::<T>() {
            Ok(queue) => {
                queue.write_all(events, cancel).await?;
                Ok(true)
            }
            Err(RouteFailure::NoChannel) => {
                tracing::warn!(
                    event_type = std::any::type_name::<T>(),
                    "no channel registered for event type; dropping events"
                );
                Ok(false)
            }
            Err(RouteFailure::Mismatch) => {
                tracing::error!(
                    event_type = std::any::type_name::<T>(),
                    error = %RaiserError::MisconfiguredChannel,
                    "dropping events"
                );
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct OrderCreated {
        order_id: String,
    }

    #[derive(Debug, PartialEq)]
    struct PaymentReceived {
        amount: u64,
    }

    #[tokio::test]
    async fn raises_to_the_registered_queue() {
        let raiser = Raiser::new();
        let queue = Queue::bounded(10);
        raiser.register_channel(queue.clone());

        let cancel = CancellationToken::new();
        let admitted = raiser
            .raise_event(
                OrderCreated {
                    order_id: "ORD-1".into(),
                },
                &cancel,
            )
            .await
            .unwrap();
        assert!(admitted);

        let reader = queue.reader();
        assert_eq!(
            reader.try_read(),
            Some(OrderCreated {
                order_id: "ORD-1".into()
            })
        );
    }

    #[tokio::test]
    async fn missing_channel_returns_false_without_erroring() {
        let raiser = Raiser::new();
        let cancel = CancellationToken::new();
        let admitted = raiser
            .raise_event(PaymentReceived { amount: 100 }, &cancel)
            .await
            .unwrap();
        assert!(!admitted);
    }

    #[tokio::test]
    async fn type_isolation_across_two_registered_channels() {
        let raiser = Raiser::new();
        let orders: Queue<OrderCreated> = Queue::bounded(10);
        let payments: Queue<PaymentReceived> = Queue::bounded(10);
        raiser.register_channel(orders.clone());
        raiser.register_channel(payments.clone());

        let cancel = CancellationToken::new();
        raiser
            .raise_event(
                OrderCreated {
                    order_id: "ORD-1".into(),
                },
                &cancel,
            )
            .await
            .unwrap();

        assert!(payments.reader().try_read().is_none());
        assert!(orders.reader().try_read().is_some());
    }

    #[tokio::test]
    async fn later_registration_for_the_same_type_wins() {
        let raiser = Raiser::new();
        let first: Queue<OrderCreated> = Queue::bounded(10);
        let second: Queue<OrderCreated> = Queue::bounded(10);
        raiser.register_channel(first.clone());
        raiser.register_channel(second.clone());

        let cancel = CancellationToken::new();
        raiser
            .raise_event(
                OrderCreated {
                    order_id: "ORD-1".into(),
                },
                &cancel,
            )
            .await
            .unwrap();

        assert!(first.reader().try_read().is_none());
        assert!(second.reader().try_read().is_some());
    }

    #[tokio::test]
    async fn raise_optional_event_rejects_none() {
        let raiser = Raiser::new();
        let queue: Queue<OrderCreated> = Queue::bounded(10);
        raiser.register_channel(queue);
        let cancel = CancellationToken::new();

        let result = raiser.raise_optional_event::<OrderCreated>(None, &cancel).await;
        assert!(matches!(
            result,
            Err(crate::error::RaiserError::NullArgument("event"))
        ));
    }
}
