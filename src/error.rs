//! Error types, partitioned along the module boundaries they originate in.

use thiserror::Error;

/// Errors raised by [`crate::queue::Queue`] operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue has been closed for writes.
    #[error("queue is closed for writes")]
    Closed,

    /// The supplied cancellation signal fired before the operation completed.
    #[error("operation cancelled")]
    Cancelled,
}

/// Errors surfaced by [`crate::raiser::Raiser`].
///
/// Neither variant is returned from [`crate::raiser::Raiser::raise_event`]
/// itself — a missing or misconfigured channel is a warning/error-level
/// logging concern, not a fatal one, so callers observe it only through the
/// `bool` return value and the logs. `MisconfiguredChannel` exists as a
/// named error value for those log sites; `NullArgument` is the one variant
/// actually returned, by [`crate::raiser::Raiser::raise_optional_event`].
#[derive(Debug, Error)]
pub enum RaiserError {
    /// A required argument was absent.
    #[error("required argument missing: {0}")]
    NullArgument(&'static str),

    /// The registered channel's type-erased entry didn't downcast to the
    /// requested `Queue[T]` — should be unreachable given the `TypeId` key.
    #[error("registered channel has a different event type than requested")]
    MisconfiguredChannel,
}

/// Errors from a single publish attempt against the [`crate::sink::Sink`] trait.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink is rate-limiting the caller; retryable.
    #[error("throttled by sink")]
    Throttled,

    /// The sink reported an internal failure; retryable.
    #[error("sink internal error: {0}")]
    InternalError(String),

    /// A non-transient request failure (bad topic, malformed request, auth).
    #[error("sink request failed ({status}): {message}")]
    Request { status: u16, message: String },

    /// A transport-level failure from the underlying HTTP client.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The sink returned a response this client could not parse.
    #[error("malformed sink response: {0}")]
    MalformedResponse(String),

    /// The caller's cancellation signal fired while the request was in flight.
    #[error("sink call cancelled")]
    Cancelled,
}

impl SinkError {
    /// Whether this failure is worth retrying: `Throttled`, `InternalError`,
    /// or a transport/response status of 500/503.
    pub fn is_transient(&self) -> bool {
        match self {
            SinkError::Throttled | SinkError::InternalError(_) => true,
            SinkError::Request { status, .. } => *status == 500 || *status == 503,
            SinkError::Transport(e) => e.is_timeout() || e.is_connect(),
            SinkError::MalformedResponse(_) | SinkError::Cancelled => false,
        }
    }
}

/// Errors from [`crate::worker::Worker`]'s publish step.
#[derive(Debug, Error)]
pub enum PublishError {
    /// JSON serialization of an event in the batch failed; the whole batch is dropped.
    #[error("failed to serialize event for publish: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The sink call failed after exhausting the retry budget. Also covers
    /// cancellation, which arrives here as `Sink(SinkError::Cancelled)`.
    #[error("sink publish failed: {0}")]
    Sink(#[from] SinkError),
}
