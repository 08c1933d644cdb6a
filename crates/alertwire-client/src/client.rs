//! Alert client facade.

use crate::config::ClientConfig;
use alertwire_core::{Alert, AlertKind, AlertPriority};
use alertwire_feed::{AlertDecoder, AlertStore, DecodeStats, InsertOutcome, StoreEvent};
use alertwire_telemetry::Metrics;
use alertwire_ws::{ConnectionConfig, ConnectionState, FrameSink, Transport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

const SOURCE_CHANNEL: &str = "channel";
const SOURCE_INJECTED: &str = "injected";
const DEFAULT_TEST_MESSAGE: &str = "Test alert";

/// Partial alert for diagnostic injection.
///
/// Unset fields get the same defaults a decoded frame would.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestAlert {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<AlertKind>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub priority: Option<AlertPriority>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl TestAlert {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn kind(mut self, kind: AlertKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn priority(mut self, priority: AlertPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn risk_score(mut self, risk_score: f64) -> Self {
        self.risk_score = Some(risk_score);
        self
    }

    pub fn sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Fill defaults and build an unread alert.
    pub fn into_alert(self, now: DateTime<Utc>) -> Alert {
        let kind = self.kind.unwrap_or_default();
        let message = self
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TEST_MESSAGE.to_string());
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(Alert::generate_id);

        let mut alert = Alert::new(id, kind, message, self.timestamp.unwrap_or(now));
        if let Some(title) = self.title.filter(|t| !t.trim().is_empty()) {
            alert.title = title;
        }
        alert.priority = self.priority;
        alert.risk_score = self.risk_score.filter(|s| s.is_finite());
        alert.sector = self.sector;
        alert.region = self.region;
        alert
    }
}

/// Receivers for connection state and store changes.
pub struct ClientSubscription {
    /// Current connection state; `changed()` resolves on every transition.
    pub state: watch::Receiver<ConnectionState>,
    /// Store mutations in order.
    pub events: broadcast::Receiver<StoreEvent>,
}

/// Decodes channel frames and feeds the store.
struct AlertIngest {
    decoder: AlertDecoder,
    store: Arc<AlertStore>,
}

impl AlertIngest {
    fn accept(&self, alert: Alert, source: &str) -> InsertOutcome {
        let kind = alert.kind;
        let outcome = self.store.insert(alert);
        Metrics::alert_ingested(kind.as_str(), source);
        if let InsertOutcome::Inserted { evicted: Some(_) } = &outcome {
            Metrics::alert_evicted();
        }
        self.record_levels();
        outcome
    }

    fn record_levels(&self) {
        Metrics::store_levels(self.store.len(), self.store.unread_count());
    }
}

impl FrameSink for AlertIngest {
    fn on_open(&self) {
        self.accept(Alert::connection_established(Utc::now()), SOURCE_CHANNEL);
    }

    fn on_frame(&self, payload: &[u8]) {
        match self.decoder.decode(payload, Utc::now()) {
            Ok(alert) => {
                self.accept(alert, SOURCE_CHANNEL);
            }
            Err(e) => Metrics::decode_failed(e.reason()),
        }
    }
}

/// The single surface consumers use for live alerts.
///
/// Share it behind an `Arc`; dropping the client ends the channel session.
pub struct AlertClient {
    transport: Transport,
    ingest: Arc<AlertIngest>,
}

impl AlertClient {
    pub fn new(connection: ConnectionConfig, max_alerts: usize) -> Self {
        let ingest = Arc::new(AlertIngest {
            decoder: AlertDecoder::new(),
            store: Arc::new(AlertStore::new(max_alerts)),
        });
        let transport = Transport::new(connection, ingest.clone());
        Self { transport, ingest }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.connection_config(), config.store.max_alerts)
    }

    /// Open the push channel. No-op while connecting or connected.
    pub fn connect(&self) {
        self.transport.connect();
    }

    /// Close the push channel and cancel any pending reconnect.
    pub fn disconnect(&self) {
        self.transport.disconnect();
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Snapshot of retained alerts, most recent first.
    pub fn alerts(&self) -> Vec<Alert> {
        self.ingest.store.snapshot()
    }

    pub fn unread_count(&self) -> usize {
        self.ingest.store.unread_count()
    }

    /// Mark one alert read. Unknown ids are ignored.
    pub fn mark_as_read(&self, id: &str) -> bool {
        let changed = self.ingest.store.mark_read(id);
        if changed {
            self.ingest.record_levels();
        }
        changed
    }

    pub fn mark_all_as_read(&self) -> usize {
        let count = self.ingest.store.mark_all_read();
        self.ingest.record_levels();
        count
    }

    pub fn clear_alerts(&self) {
        let count = self.ingest.store.clear();
        self.ingest.record_levels();
        debug!(count, "Cleared alerts");
    }

    /// Insert a synthetic alert without going through the channel.
    ///
    /// For diagnostic tooling only. Returns the alert as stored.
    pub fn inject_test_alert(&self, partial: TestAlert) -> Alert {
        let alert = partial.into_alert(Utc::now());
        info!(id = %alert.id, kind = %alert.kind, "Injecting test alert");
        let id = alert.id.clone();
        self.ingest.accept(alert.clone(), SOURCE_INJECTED);
        self.ingest.store.get(&id).unwrap_or(alert)
    }

    pub fn subscribe(&self) -> ClientSubscription {
        ClientSubscription {
            state: self.transport.subscribe_state(),
            events: self.ingest.store.subscribe(),
        }
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> Arc<AlertStore> {
        self.ingest.store.clone()
    }

    /// Decoded and discarded frame counts.
    pub fn decode_stats(&self) -> &DecodeStats {
        self.ingest.decoder.stats()
    }

    /// Consecutive failed attempts since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.transport.reconnect_attempts()
    }
}
