//! Retry with capped exponential backoff.
//!
//! Applies to synchronous REST calls only. Bulk pipeline stages opt out per
//! request ([`RequestBuilder::without_retry`](crate::RequestBuilder::without_retry))
//! so a failed upload or close is reported to the caller instead of replayed.

use rand::Rng;
use std::time::Duration;

/// How many times, and how patiently, a retryable failure is repeated.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any computed delay.
    pub max_delay: Duration,
    /// Multiplier applied per attempt.
    pub factor: f64,
    /// Add up to one extra base delay of random jitter.
    pub jitter: bool,
    /// Upper bound for a server-provided `Retry-After`.
    pub max_retry_after: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            factor: 2.0,
            jitter: true,
            max_retry_after: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Never retry.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Toggle random jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt` (0-based), ignoring `Retry-After`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.factor.powi(attempt as i32);
        let jitter = if self.jitter {
            rand::rng().random::<f64>() * base
        } else {
            0.0
        };
        let capped = (base + jitter).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

/// Per-request retry state.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    attempt: u32,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Retries consumed so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Consume one retry and return how long to wait first, or `None` once
    /// the budget is spent. A server `Retry-After` wins over the computed
    /// backoff but is capped at `max_retry_after`.
    pub fn next_delay(&mut self, retry_after: Option<Duration>) -> Option<Duration> {
        if self.attempt >= self.config.max_attempts {
            return None;
        }
        let delay = match retry_after {
            Some(after) => after.min(self.config.max_retry_after),
            None => self.config.backoff(self.attempt),
        };
        self.attempt += 1;
        Some(delay)
    }
}
