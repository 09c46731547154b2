//! Reconnect delay schedule
//!
//! Delay for attempt `n` (1-based) is `min(base * 2^(n-1), cap)` plus a
//! uniform random jitter in `[0, jitter]`.

use std::time::Duration;

use crate::config::BackoffConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    jitter: Duration,
}

impl Backoff {
    pub const DEFAULT_BASE: Duration = Duration::from_millis(500);
    pub const DEFAULT_CAP: Duration = Duration::from_secs(30);
    pub const DEFAULT_JITTER: Duration = Duration::from_millis(100);

    /// Create a schedule without jitter
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap: cap.max(base),
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(config.base(), config.cap()).with_jitter(config.jitter())
    }

    /// Deterministic part of the delay for `attempt`
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base.saturating_mul(1u32 << exponent).min(self.cap)
    }

    /// Delay to wait before `attempt`, jitter included
    pub fn delay(&self, attempt: u32) -> Duration {
        let delay = self.base_delay(attempt);
        let jitter_nanos = u64::try_from(self.jitter.as_nanos()).unwrap_or(u64::MAX);
        if jitter_nanos == 0 {
            return delay;
        }
        delay.saturating_add(Duration::from_nanos(fastrand::u64(0..=jitter_nanos)))
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn cap(&self) -> Duration {
        self.cap
    }

    pub fn jitter(&self) -> Duration {
        self.jitter
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE, Self::DEFAULT_CAP).with_jitter(Self::DEFAULT_JITTER)
    }
}
