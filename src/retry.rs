//! Resilience policy: transient-failure classification and exponential
//! backoff. Injectable — callers may supply any `ResiliencePolicy`.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::error::SinkError;

/// Jitter applied on top of the deterministic `2^k` backoff schedule.
///
/// The default schedule is the exact `2^k` delay with no jitter, so a
/// worker's retry logs show deterministic, reproducible delays;
/// `JitterMode::None` is the default for that reason. Full/Equal/Decorrelated
/// jitter remain available for callers who supply a custom policy and want
/// to avoid thundering-herd retries across many worker instances.
#[derive(Clone, Debug, Default)]
pub enum JitterMode {
    /// No jitter — use the exact computed delay.
    #[default]
    None,
    /// Full jitter: random delay between 0 and the computed delay.
    Full,
    /// Equal jitter: half fixed, half random.
    Equal,
    /// Decorrelated jitter (AWS-recommended): `base + random(0, delay*3 - base)`.
    Decorrelated,
}

fn apply_jitter(delay: Duration, mode: &JitterMode) -> Duration {
    let mut rng = rand::thread_rng();
    match mode {
        JitterMode::None => delay,
        JitterMode::Full => Duration::from_secs_f64(rng.gen::<f64>() * delay.as_secs_f64()),
        JitterMode::Equal => {
            let half = delay.as_secs_f64() / 2.0;
            Duration::from_secs_f64(half + rng.gen::<f64>() * half)
        }
        JitterMode::Decorrelated => {
            let base = delay.as_secs_f64() / 3.0;
            let upper = delay.as_secs_f64() * 3.0;
            Duration::from_secs_f64(base + rng.gen::<f64>() * (upper - base))
        }
    }
}

/// Classifies sink failures as retryable and supplies the backoff schedule.
pub trait ResiliencePolicy: Send + Sync {
    /// Maximum number of retry attempts after the initial try.
    fn max_retry_attempts(&self) -> u32;

    /// Whether `err` should be retried at all. Defaults to
    /// [`SinkError::is_transient`]; override to customize classification.
    fn is_transient(&self, err: &SinkError) -> bool {
        err.is_transient()
    }

    /// Delay to wait before retry attempt `k` (`k` in `1..=max_retry_attempts`).
    fn backoff(&self, attempt: u32) -> Duration;
}

/// The spec's default policy: retry transient failures up to `max_retry_attempts`
/// times, waiting `2^k` seconds (optionally jittered) before attempt `k`.
#[derive(Clone, Debug)]
pub struct DefaultResiliencePolicy {
    pub max_retry_attempts: u32,
    pub jitter: JitterMode,
}

impl Default for DefaultResiliencePolicy {
    fn default() -> Self {
        DefaultResiliencePolicy {
            max_retry_attempts: 3,
            jitter: JitterMode::None,
        }
    }
}

impl DefaultResiliencePolicy {
    pub fn with_max_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_retry_attempts = attempts;
        self
    }

    pub fn with_jitter(mut self, jitter: JitterMode) -> Self {
        self.jitter = jitter;
        self
    }
}

impl ResiliencePolicy for DefaultResiliencePolicy {
    fn max_retry_attempts(&self) -> u32 {
        self.max_retry_attempts
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = Duration::from_secs(2u64.saturating_pow(attempt));
        apply_jitter(base, &self.jitter)
    }
}

/// Run `op` under `policy`, retrying transient [`SinkError`]s with backoff.
/// A fired `cancel` aborts an in-progress backoff wait and turns it into
/// `SinkError::Cancelled`; the in-flight attempt of `op` itself is expected
/// to race `cancel` on its own (the default [`crate::sink::HttpSink`] does).
pub async fn execute_with_retry<F, Fut, T>(
    policy: &dyn ResiliencePolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, SinkError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SinkError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if policy.is_transient(&err) && attempt < policy.max_retry_attempts() => {
                attempt += 1;
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    cause = %err,
                    "retrying after transient sink failure"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(SinkError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(err) => return Err(err),
        }
    }
}
