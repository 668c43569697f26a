//! Bounded per-type FIFO queue.
//!
//! A [`Queue<T>`] supports any number of producers and exactly one consumer.
//! Capacity is enforced with a [`Semaphore`]: a write acquires one owned
//! permit before pushing, and the permit is dropped (returning capacity)
//! exactly when the worker removes the item from the buffer. Unbounded
//! queues skip the semaphore entirely.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::QueueError;

struct Entry<T> {
    item: T,
    // Held until the entry is popped by the reader; dropping it returns
    // one unit of capacity to the bounded semaphore.
    _permit: Option<OwnedSemaphorePermit>,
}

struct Inner<T> {
    buffer: Mutex<VecDeque<Entry<T>>>,
    capacity: Option<Arc<Semaphore>>,
    closed: Mutex<bool>,
    readable: Notify,
}

/// A bounded (or unbounded) FIFO queue of events of a single type `T`.
///
/// Cheaply cloneable; clones share the same underlying buffer. Use
/// [`Queue::reader`] to obtain the single consumer-side handle.
pub struct Queue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Queue {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + 'static> Queue<T> {
    /// Create a bounded queue holding at most `capacity` items.
    pub fn bounded(capacity: usize) -> Self {
        Queue {
            inner: Arc::new(Inner {
                buffer: Mutex::new(VecDeque::new()),
                capacity: Some(Arc::new(Semaphore::new(capacity))),
                closed: Mutex::new(false),
                readable: Notify::new(),
            }),
        }
    }

    /// Create an unbounded queue. Writes never block on capacity.
    pub fn unbounded() -> Self {
        Queue {
            inner: Arc::new(Inner {
                buffer: Mutex::new(VecDeque::new()),
                capacity: None,
                closed: Mutex::new(false),
                readable: Notify::new(),
            }),
        }
    }

    /// Write one item, blocking the caller while the queue is full.
    ///
    /// Returns `Ok(true)` on admission. Returns `Err(QueueError::Cancelled)`
    /// if `cancel` fires first, or `Err(QueueError::Closed)` if the queue has
    /// been closed for writes.
    pub async fn write(&self, item: T, cancel: &CancellationToken) -> Result<bool, QueueError> {
        if *self.inner.closed.lock() {
            return Err(QueueError::Closed);
        }

        let permit = match &self.inner.capacity {
            Some(sem) => {
                let sem = sem.clone();
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(QueueError::Cancelled),
                    acquired = sem.acquire_owned() => {
                        // The semaphore is never closed, so acquire_owned cannot fail.
                        Some(acquired.expect("queue semaphore should never be closed"))
                    }
                }
            }
            None => None,
        };

        // Closing can race with a long wait for capacity; re-check after acquiring.
        if *self.inner.closed.lock() {
            return Err(QueueError::Closed);
        }

        self.inner.buffer.lock().push_back(Entry {
            item,
            _permit: permit,
        });
        self.inner.readable.notify_one();
        Ok(true)
    }

    /// Write each item in order via [`Queue::write`]. Short-circuits on the
    /// first cancellation; items already admitted stay admitted. Callers
    /// wanting all-or-nothing semantics build it above this API.
    pub async fn write_all(
        &self,
        items: impl IntoIterator<Item = T>,
        cancel: &CancellationToken,
    ) -> Result<(), QueueError> {
        for item in items {
            self.write(item, cancel).await?;
        }
        Ok(())
    }

    /// Mark the queue closed for writes. Readers drain remaining items and
    /// then observe end-of-stream; further writes fail with `Closed`.
    pub fn close(&self) {
        *self.inner.closed.lock() = true;
        self.inner.readable.notify_one();
    }

    /// Obtain the single consumer-side reader handle.
    pub fn reader(&self) -> Reader<T> {
        Reader {
            inner: self.inner.clone(),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.buffer.lock().len()
    }
}

/// Consumer-side handle to a [`Queue<T>`]. Intended for exclusive use by a
/// single worker task.
pub struct Reader<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Reader<T> {
    /// Block until at least one item is available or the queue is closed
    /// (in which case, if the buffer is also empty, this returns immediately
    /// so the caller can observe end-of-stream via `try_read`/`try_peek`).
    pub async fn wait_to_read(&self, cancel: &CancellationToken) -> Result<(), QueueError> {
        loop {
            if !self.inner.buffer.lock().is_empty() {
                return Ok(());
            }
            if *self.inner.closed.lock() {
                return Ok(());
            }

            let notified = self.inner.readable.notified();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(QueueError::Cancelled),
                _ = notified => {}
            }
        }
    }

    /// Non-blocking read. Returns `None` if the buffer is currently empty.
    pub fn try_read(&self) -> Option<T> {
        self.inner.buffer.lock().pop_front().map(|e| e.item)
    }

    /// Non-blocking check for whether an item would be immediately readable.
    pub fn try_peek(&self) -> bool {
        !self.inner.buffer.lock().is_empty()
    }

    /// Whether the queue has been closed for writes and fully drained —
    /// i.e. end-of-stream has been reached.
    pub fn is_at_end_of_stream(&self) -> bool {
        *self.inner.closed.lock() && self.inner.buffer.lock().is_empty()
    }
}
