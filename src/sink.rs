//! The sink contract and a default `reqwest`-backed implementation.
//!
//! The core never depends on the real AWS SNS SDK; it depends on this
//! trait. Production embedders inject their own [`Sink`] via
//! [`crate::config::EventTypeConfig::sink_client`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::SinkError;

/// One entry in a publish batch: a batch-local id and a serialized message body.
#[derive(Debug, Clone, Serialize)]
pub struct PublishEntry {
    pub id: String,
    pub message: String,
}

/// One successfully published entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SuccessEntry {
    pub id: String,
    pub message_id: String,
}

/// One entry that failed to publish.
#[derive(Debug, Clone, Deserialize)]
pub struct FailedEntry {
    pub id: String,
    pub code: String,
    pub message: String,
}

/// The result of one [`Sink::publish_batch`] call: disjoint success/failure lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishOutcome {
    #[serde(default)]
    pub successful: Vec<SuccessEntry>,
    #[serde(default)]
    pub failed: Vec<FailedEntry>,
}

/// A topic-based notification sink, e.g. AWS SNS. The only I/O the core performs.
///
/// Implementations must be `Send + Sync` and cheap to clone (an `Arc`-wrapped
/// client internally is typical), since one handle is shared by every
/// worker task publishing to that sink.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Publish up to 10 entries to `topic` in a single request.
    async fn publish_batch(
        &self,
        topic: &str,
        entries: &[PublishEntry],
        cancel: &CancellationToken,
    ) -> Result<PublishOutcome, SinkError>;
}

/// A default [`Sink`] implementation over `reqwest`, standing in for a real
/// AWS SNS SDK client. POSTs `{ "topic_arn": ..., "entries": [...] }` to
/// `base_url` and expects a [`PublishOutcome`]-shaped JSON response.
#[derive(Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct PublishRequest<'a> {
    topic_arn: &'a str,
    entries: &'a [PublishEntry],
}

impl HttpSink {
    /// Build a sink posting to `base_url` with the given per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpSink {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl Sink for HttpSink {
    async fn publish_batch(
        &self,
        topic: &str,
        entries: &[PublishEntry],
        cancel: &CancellationToken,
    ) -> Result<PublishOutcome, SinkError> {
        let request = self
            .client
            .post(&self.base_url)
            .json(&PublishRequest {
                topic_arn: topic,
                entries,
            })
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SinkError::Cancelled),
            result = request => result?,
        };

        let status = response.status().as_u16();
        match status {
            200..=299 => response
                .json::<PublishOutcome>()
                .await
                .map_err(|e| SinkError::MalformedResponse(e.to_string())),
            429 => Err(SinkError::Throttled),
            500 | 503 => {
                let body = response.text().await.unwrap_or_default();
                Err(SinkError::InternalError(body))
            }
            other => {
                let body = response.text().await.unwrap_or_default();
                Err(SinkError::Request {
                    status: other,
                    message: body,
                })
            }
        }
    }
}
