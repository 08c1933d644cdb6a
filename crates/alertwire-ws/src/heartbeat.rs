//! Liveness tracking for the push channel.
//!
//! A ping goes out after `interval` of inbound silence; if no pong (or any
//! other inbound frame) arrives within `timeout`, the channel is treated
//! as dead. Owned by the session task, so no locking.

use std::time::Duration;
use tokio::time::Instant;

/// Outcome of a liveness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessCheck {
    /// Nothing to do.
    Healthy,
    /// Silence exceeded the interval; send a ping.
    SendPing,
    /// A ping went unanswered past the timeout.
    TimedOut,
}

/// Ping/pong bookkeeping for one open channel.
#[derive(Debug)]
pub struct Liveness {
    interval: Duration,
    timeout: Duration,
    last_inbound: Instant,
    ping_sent_at: Option<Instant>,
}

impl Liveness {
    /// `interval_ms == 0` disables liveness checks.
    pub fn new(interval_ms: u64, timeout_ms: u64, now: Instant) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(timeout_ms),
            last_inbound: now,
            ping_sent_at: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Any inbound frame proves the peer is alive.
    pub fn record_inbound(&mut self, now: Instant) {
        self.last_inbound = now;
        self.ping_sent_at = None;
    }

    pub fn record_pong(&mut self, now: Instant) {
        if let Some(sent) = self.ping_sent_at {
            tracing::debug!(rtt_ms = now.duration_since(sent).as_millis() as u64, "Received pong");
        }
        self.record_inbound(now);
    }

    pub fn record_ping(&mut self, now: Instant) {
        self.ping_sent_at = Some(now);
    }

    /// When the next check is due.
    pub fn next_check(&self) -> Instant {
        match self.ping_sent_at {
            Some(sent) => sent + self.timeout,
            None => self.last_inbound + self.interval,
        }
    }

    pub fn poll(&self, now: Instant) -> LivenessCheck {
        if !self.is_enabled() {
            return LivenessCheck::Healthy;
        }
        match self.ping_sent_at {
            Some(sent) if now.duration_since(sent) >= self.timeout => LivenessCheck::TimedOut,
            Some(_) => LivenessCheck::Healthy,
            None if now.duration_since(self.last_inbound) >= self.interval => {
                LivenessCheck::SendPing
            }
            None => LivenessCheck::Healthy,
        }
    }
}
