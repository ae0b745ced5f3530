//! Retry policy and backoff helpers for model calls.
//!
//! The policy is an explicit value passed into the resilient client, with
//! the retry loop as an explicit wrapper around the transport call. No
//! implicit interception layers.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::errors::ProviderError;

/// Retry policy for the resilient model client.
///
/// `max_attempts` counts the first call, so the reference policy of six
/// total attempts retries five times.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    /// Reference policy: 1s → 2s → 4s … capped at 60s, 6 total attempts, jitter.
    fn default() -> Self {
        Self {
            max_attempts: 6,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            // A policy must allow at least the initial call.
            max_attempts: max_attempts.max(1),
            min_delay,
            max_delay,
        }
    }

    /// Build the backon backoff for this policy.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::new()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_jitter()
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }
}

/// If the error is `RateLimited`, ensure the delay is at least `retry_after_ms`.
///
/// Signature matches `backon::Retry::adjust`: returning `None` aborts the retry.
pub fn adjust_for_rate_limit(err: &anyhow::Error, dur: Option<Duration>) -> Option<Duration> {
    match (err.downcast_ref::<ProviderError>(), dur) {
        (Some(ProviderError::RateLimited { retry_after_ms, .. }), Some(d)) => {
            let rate_limit_delay = Duration::from_millis(*retry_after_ms);
            Some(d.max(rate_limit_delay))
        }
        (_, dur) => dur,
    }
}
