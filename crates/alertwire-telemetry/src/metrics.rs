//! Prometheus metrics for the alert client.
//!
//! Covers:
//! - Push channel state and reconnects
//! - Inbound frames and decode failures
//! - Store size, unread count and evictions
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a startup configuration error; it can
//! only happen during static initialization.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec,
    register_int_gauge, Counter, CounterVec, Encoder, Gauge, GaugeVec, IntGauge, TextEncoder,
};

/// Push channel connected (1 = connected, 0 = otherwise).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "alertwire_ws_connected",
        "Push channel connection state (1=connected)"
    )
    .unwrap()
});

/// Push channel state machine current state.
/// Labels: state (idle/connecting/connected/disconnected)
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "alertwire_ws_state",
        "Push channel state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Total reconnection attempts scheduled.
pub static WS_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "alertwire_ws_reconnect_total",
        "Total push channel reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

/// Current consecutive reconnect attempt.
pub static WS_RECONNECT_ATTEMPT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "alertwire_ws_reconnect_attempt",
        "Consecutive reconnect attempts since the last successful open"
    )
    .unwrap()
});

/// Total data frames received from the channel.
pub static FRAMES_RECEIVED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "alertwire_frames_received_total",
        "Total data frames received from the push channel"
    )
    .unwrap()
});

/// Frames discarded by the decoder.
pub static DECODE_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "alertwire_decode_failures_total",
        "Total frames discarded by the alert decoder",
        &["reason"]
    )
    .unwrap()
});

/// Alerts accepted into the store.
pub static ALERTS_INGESTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "alertwire_alerts_ingested_total",
        "Total alerts inserted into the store",
        &["type", "source"]
    )
    .unwrap()
});

/// Alerts dropped from the tail of the store.
pub static ALERTS_EVICTED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "alertwire_alerts_evicted_total",
        "Total alerts evicted by the retention cap"
    )
    .unwrap()
});

/// Alerts currently retained.
pub static ALERTS_STORED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("alertwire_alerts_stored", "Alerts currently retained").unwrap()
});

/// Retained alerts not yet read.
pub static ALERTS_UNREAD: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("alertwire_alerts_unread", "Retained alerts not yet read").unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Set push channel state.
    /// Only the active state is set to 1, all others to 0.
    pub fn ws_state_set(state: &str) {
        for s in &["idle", "connecting", "connected", "disconnected"] {
            WS_STATE.with_label_values(&[s]).set(0.0);
        }
        WS_STATE.with_label_values(&[state]).set(1.0);
        WS_CONNECTED.set(if state == "connected" { 1.0 } else { 0.0 });
    }

    /// Record a scheduled reconnect.
    pub fn ws_reconnect(reason: &str, attempt: u32) {
        WS_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
        WS_RECONNECT_ATTEMPT.set(i64::from(attempt));
    }

    /// Reset the consecutive attempt gauge after a successful open.
    pub fn ws_reconnect_reset() {
        WS_RECONNECT_ATTEMPT.set(0);
    }

    pub fn frame_received() {
        FRAMES_RECEIVED_TOTAL.inc();
    }

    pub fn decode_failed(reason: &str) {
        DECODE_FAILURES_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record an alert accepted into the store.
    /// `source` is `channel` or `injected`.
    pub fn alert_ingested(kind: &str, source: &str) {
        ALERTS_INGESTED_TOTAL
            .with_label_values(&[kind, source])
            .inc();
    }

    pub fn alert_evicted() {
        ALERTS_EVICTED_TOTAL.inc();
    }

    /// Update store gauges.
    pub fn store_levels(stored: usize, unread: usize) {
        ALERTS_STORED.set(stored as i64);
        ALERTS_UNREAD.set(unread as i64);
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
