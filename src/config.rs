//! Per-event-type configuration surface.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::queue::Queue;
use crate::retry::{DefaultResiliencePolicy, ResiliencePolicy};
use crate::sink::Sink;

/// The subset of [`EventTypeConfig`] that is plain data and can round-trip
/// through the embedding application's own configuration layer (a TOML/YAML
/// file, environment-derived struct, etc.) via `serde`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventTypeSettings {
    /// Remote topic identifier the worker publishes to.
    pub topic_id: String,
    /// Retry budget for transient failures.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    /// Switch between a bounded and an unbounded queue.
    #[serde(default = "default_use_bounded_capacity")]
    pub use_bounded_capacity: bool,
    /// Queue depth when bounded.
    #[serde(default = "default_bounded_capacity")]
    pub bounded_capacity: usize,
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_use_bounded_capacity() -> bool {
    true
}

fn default_bounded_capacity() -> usize {
    1_000_000
}

impl EventTypeSettings {
    pub fn new(topic_id: impl Into<String>) -> Self {
        EventTypeSettings {
            topic_id: topic_id.into(),
            max_retry_attempts: default_max_retry_attempts(),
            use_bounded_capacity: default_use_bounded_capacity(),
            bounded_capacity: default_bounded_capacity(),
        }
    }
}

/// Full runtime configuration for one event type: the plain [`EventTypeSettings`]
/// plus the non-serializable resiliency-policy and sink-client overrides.
#[derive(Clone)]
pub struct EventTypeConfig {
    pub settings: EventTypeSettings,
    resiliency_policy: Option<Arc<dyn ResiliencePolicy>>,
    sink_client: Option<Arc<dyn Sink>>,
}

impl EventTypeConfig {
    /// Start building a config for the required `topic_id`.
    pub fn builder(topic_id: impl Into<String>) -> EventTypeConfigBuilder {
        EventTypeConfigBuilder::new(topic_id)
    }

    /// Build directly from settings loaded elsewhere (e.g. deserialized from
    /// the embedding app's config file), with no policy/sink overrides.
    pub fn from_settings(settings: EventTypeSettings) -> Self {
        EventTypeConfig {
            settings,
            resiliency_policy: None,
            sink_client: None,
        }
    }

    /// Construct the queue this event type's worker should drain — bounded
    /// or unbounded per [`EventTypeSettings::use_bounded_capacity`].
    pub fn build_queue<T: Send + 'static>(&self) -> Queue<T> {
        if self.settings.use_bounded_capacity {
            Queue::bounded(self.settings.bounded_capacity)
        } else {
            Queue::unbounded()
        }
    }

    /// The resilience policy to use: the configured override, or a
    /// [`DefaultResiliencePolicy`] seeded with `max_retry_attempts`.
    pub fn resiliency_policy(&self) -> Arc<dyn ResiliencePolicy> {
        self.resiliency_policy.clone().unwrap_or_else(|| {
            Arc::new(
                DefaultResiliencePolicy::default()
                    .with_max_retry_attempts(self.settings.max_retry_attempts),
            )
        })
    }

    /// The sink client override, if one was configured.
    pub fn sink_client(&self) -> Option<Arc<dyn Sink>> {
        self.sink_client.clone()
    }
}

/// Builder for [`EventTypeConfig`]: consuming setters over a default-seeded
/// settings struct, with an explicit `build` to produce the final config.
#[must_use = "builders do nothing unless you call .build()"]
pub struct EventTypeConfigBuilder {
    settings: EventTypeSettings,
    resiliency_policy: Option<Arc<dyn ResiliencePolicy>>,
    sink_client: Option<Arc<dyn Sink>>,
}

impl EventTypeConfigBuilder {
    pub fn new(topic_id: impl Into<String>) -> Self {
        EventTypeConfigBuilder {
            settings: EventTypeSettings::new(topic_id),
            resiliency_policy: None,
            sink_client: None,
        }
    }

    pub fn max_retry_attempts(mut self, attempts: u32) -> Self {
        self.settings.max_retry_attempts = attempts;
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.settings.use_bounded_capacity = false;
        self
    }

    pub fn bounded_capacity(mut self, capacity: usize) -> Self {
        self.settings.use_bounded_capacity = true;
        self.settings.bounded_capacity = capacity;
        self
    }

    pub fn resiliency_policy(mut self, policy: Arc<dyn ResiliencePolicy>) -> Self {
        self.resiliency_policy = Some(policy);
        self
    }

    pub fn sink_client(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink_client = Some(sink);
        self
    }

    pub fn build(self) -> EventTypeConfig {
        EventTypeConfig {
            settings: self.settings,
            resiliency_policy: self.resiliency_policy,
            sink_client: self.sink_client,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_spec_table() {
        let config = EventTypeConfig::builder("arn:aws:sns:us-east-1:000000000000:orders").build();
        assert_eq!(config.settings.max_retry_attempts, 3);
        assert!(config.settings.use_bounded_capacity);
        assert_eq!(config.settings.bounded_capacity, 1_000_000);
    }

    #[test]
    fn settings_deserialize_with_defaults_from_partial_json() {
        let settings: EventTypeSettings =
            serde_json::from_str(r#"{"topic_id": "arn:aws:sns:us-east-1:000000000000:orders"}"#)
                .unwrap();
        assert_eq!(settings.max_retry_attempts, 3);
        assert!(settings.use_bounded_capacity);
        assert_eq!(settings.bounded_capacity, 1_000_000);
    }
}
