//! Exponential backoff with jitter for the producer's and controller
//! client's retry loops: base 100 ms, cap 2 s, ±20% jitter, default 3
//! retries. `BackoffConfig` holds the tunables and `Backoff` is the
//! single-use state stepped once per attempt, the same split
//! `client/controller.rs` and the throttle handling use call-by-call.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    pub base: Duration,
    pub cap: Duration,
    pub max_retries: usize,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
            cap: Duration::from_secs(2),
            max_retries: 3,
        }
    }
}

/// Stateful backoff sequence: call [`Backoff::next_delay`] once per retry
/// attempt; returns `None` once `max_retries` attempts have been consumed.
#[derive(Debug)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: usize,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// The delay for the next attempt, or `None` if retries are exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.config.max_retries {
            return None;
        }

        let exp = self.config.base.as_millis().saturating_mul(1u128 << self.attempt);
        let capped = exp.min(self.config.cap.as_millis());
        self.attempt += 1;

        let jitter_fraction = rand::thread_rng().gen_range(-0.2..=0.2);
        let jittered = (capped as f64) * (1.0 + jitter_fraction);
        Some(Duration::from_millis(jittered.max(0.0) as u64))
    }

    pub fn attempts(&self) -> usize {
        self.attempt
    }
}
