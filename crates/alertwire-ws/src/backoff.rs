//! Reconnection policy.
//!
//! Exponential backoff: `base * 2^attempt`, capped at `max_delay_ms`.
//! Jitter only ever shortens the delay, so the jittered value stays
//! within the cap.

use rand::Rng;
use std::time::Duration;

/// Largest exponent applied before capping.
const MAX_EXPONENT: u32 = 20;

/// Retry timing and give-up rules for the push channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub base_delay_ms: u64,
    /// Upper bound for any delay.
    pub max_delay_ms: u64,
    /// Fraction of the delay that may be shaved off at random (0.0-1.0).
    pub jitter_ratio: f64,
    /// Maximum consecutive retries (0 = infinite).
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            jitter_ratio: 0.2,
            max_attempts: 0,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (0-based), without jitter.
    ///
    /// Non-decreasing in `attempt` and never above `max_delay_ms`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(MAX_EXPONENT);
        let delay = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Delay before retry number `attempt`, with random jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let ratio = self.effective_jitter();
        if ratio == 0.0 {
            return self.base_delay(attempt);
        }
        let unit = rand::thread_rng().gen_range(0.0..=1.0);
        self.delay_with_unit(attempt, unit)
    }

    /// Jittered delay for a given random draw in `[0, 1]`.
    pub fn delay_with_unit(&self, attempt: u32, unit: f64) -> Duration {
        let base = self.base_delay(attempt).as_millis() as f64;
        let shave = base * self.effective_jitter() * unit.clamp(0.0, 1.0);
        Duration::from_millis((base - shave).round() as u64)
    }

    /// Whether another retry is allowed after `attempts` consecutive failures.
    pub fn should_retry(&self, attempts: u32) -> bool {
        self.max_attempts == 0 || attempts < self.max_attempts
    }

    fn effective_jitter(&self) -> f64 {
        if self.jitter_ratio.is_finite() {
            self.jitter_ratio.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
