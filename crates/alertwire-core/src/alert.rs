//! Alert entity and its classification enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Message carried by the synthetic alert emitted when the channel opens.
pub const CONNECTED_MESSAGE: &str = "Connected to live alerts";

/// Alert category.
///
/// Only used for icon/label selection downstream. Unknown wire values
/// decode as `Generic` so new server-side types never get rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Channel lifecycle notice (synthetic, emitted on open).
    Connection,
    /// A submitted tip scored above the risk threshold.
    HighRiskTip,
    /// A linked fraud chain gained or changed members.
    FraudChainUpdate,
    /// A verified document failed an integrity check.
    DocumentAnomaly,
    /// Anything else.
    #[default]
    #[serde(other)]
    Generic,
}

impl AlertKind {
    /// Wire name, as sent in the `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::HighRiskTip => "high_risk_tip",
            Self::FraudChainUpdate => "fraud_chain_update",
            Self::DocumentAnomaly => "document_anomaly",
            Self::Generic => "generic",
        }
    }

    /// Map a wire name to a kind, falling back to `Generic`.
    pub fn from_wire(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "connection" => Self::Connection,
            "high_risk_tip" => Self::HighRiskTip,
            "fraud_chain_update" => Self::FraudChainUpdate,
            "document_anomaly" => Self::DocumentAnomaly,
            _ => Self::Generic,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert priority badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
}

impl AlertPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parse a wire priority. Unknown values mean "unprioritized".
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single push notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique within the store's retention window.
    pub id: String,
    /// Alert category.
    #[serde(rename = "type")]
    pub kind: AlertKind,
    /// Display title. Defaults to the kind's wire name.
    pub title: String,
    /// Display text.
    pub message: String,
    /// Absent means unprioritized (no badge).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<AlertPriority>,
    /// Generation time (server clock, or receipt time as fallback).
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Only the store flips this, and only on an explicit mark-read.
    #[serde(default)]
    pub read: bool,
}

impl Alert {
    /// Create an unread alert with no optional context.
    pub fn new(
        id: impl Into<String>,
        kind: AlertKind,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            title: kind.as_str().to_string(),
            message: message.into(),
            priority: None,
            timestamp,
            risk_score: None,
            sector: None,
            region: None,
            read: false,
        }
    }

    /// Synthetic alert recorded when the push channel opens.
    pub fn connection_established(at: DateTime<Utc>) -> Self {
        let mut alert = Self::new(
            Self::generate_id(),
            AlertKind::Connection,
            CONNECTED_MESSAGE,
            at,
        );
        alert.title = "Connected".to_string();
        alert
    }

    /// Client-side fallback id.
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_priority(mut self, priority: AlertPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_risk_score(mut self, risk_score: f64) -> Self {
        self.risk_score = Some(risk_score);
        self
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn is_unread(&self) -> bool {
        !self.read
    }
}
