//! Client configuration.

use crate::error::{ClientError, ClientResult};
use alertwire_feed::DEFAULT_MAX_ALERTS;
use alertwire_ws::{ConnectionConfig, ReconnectPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Push channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// WebSocket URL of the push endpoint.
    #[serde(default = "default_url")]
    pub url: String,
    /// Inbound silence before a liveness ping (ms, 0 = disabled).
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// How long a ping may go unanswered (ms).
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
}

fn default_url() -> String {
    "ws://localhost:8000/ws/alerts".to_string()
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    10_000
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
        }
    }
}

/// Reconnect backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// First retry delay (ms). Default: 1000.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Delay cap (ms). Default: 30000.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Fraction of each delay removed at random (0.0-1.0). Default: 0.2.
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,
    /// Consecutive retries before giving up (0 = never give up).
    #[serde(default)]
    pub max_attempts: u32,
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_jitter_ratio() -> f64 {
    0.2
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ratio: default_jitter_ratio(),
            max_attempts: 0,
        }
    }
}

/// Alert store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Retention cap. Default: 50.
    #[serde(default = "default_max_alerts")]
    pub max_alerts: usize,
}

fn default_max_alerts() -> usize {
    DEFAULT_MAX_ALERTS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_alerts: default_max_alerts(),
        }
    }
}

/// Diagnostic trigger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Endpoint that evaluates a submitted test item.
    #[serde(default = "default_trigger_url")]
    pub trigger_url: String,
    /// HTTP timeout (ms). Default: 10000.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_trigger_url() -> String {
    "http://localhost:8000/api/alerts/test".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            trigger_url: default_trigger_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

impl ClientConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> ClientResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ClientError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.channel.url.trim().is_empty() {
            return Err(ClientError::Config("channel.url must not be empty".into()));
        }
        if self.store.max_alerts == 0 {
            return Err(ClientError::Config("store.max_alerts must be at least 1".into()));
        }
        if self.reconnect.base_delay_ms > self.reconnect.max_delay_ms {
            return Err(ClientError::Config(format!(
                "reconnect.base_delay_ms ({}) exceeds reconnect.max_delay_ms ({})",
                self.reconnect.base_delay_ms, self.reconnect.max_delay_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.reconnect.jitter_ratio) {
            return Err(ClientError::Config(format!(
                "reconnect.jitter_ratio must be within 0.0..=1.0, got {}",
                self.reconnect.jitter_ratio
            )));
        }
        Ok(())
    }

    /// Transport settings derived from this configuration.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            url: self.channel.url.clone(),
            heartbeat_interval_ms: self.channel.heartbeat_interval_ms,
            heartbeat_timeout_ms: self.channel.heartbeat_timeout_ms,
            reconnect: ReconnectPolicy {
                base_delay_ms: self.reconnect.base_delay_ms,
                max_delay_ms: self.reconnect.max_delay_ms,
                jitter_ratio: self.reconnect.jitter_ratio,
                max_attempts: self.reconnect.max_attempts,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config.channel.url, "ws://localhost:8000/ws/alerts");
        assert_eq!(config.reconnect.base_delay_ms, 1000);
        assert_eq!(config.reconnect.max_delay_ms, 30000);
        assert_eq!(config.store.max_alerts, 50);
    }

    #[test]
    fn test_partial_sections() {
        let config = ClientConfig::from_toml_str(
            r#"
            [channel]
            url = "wss://alerts.example.com/ws"

            [store]
            max_alerts = 200
            "#,
        )
        .unwrap();
        assert_eq!(config.channel.url, "wss://alerts.example.com/ws");
        assert_eq!(config.channel.heartbeat_interval_ms, 30000);
        assert_eq!(config.store.max_alerts, 200);
        assert_eq!(config.reconnect.jitter_ratio, 0.2);
    }

    #[test]
    fn test_connection_config_mapping() {
        let config = ClientConfig::from_toml_str(
            r#"
            [reconnect]
            base_delay_ms = 500
            max_delay_ms = 8000
            jitter_ratio = 0.0
            max_attempts = 4
            "#,
        )
        .unwrap();
        let conn = config.connection_config();
        assert_eq!(conn.url, config.channel.url);
        assert_eq!(conn.reconnect.base_delay_ms, 500);
        assert_eq!(conn.reconnect.max_delay_ms, 8000);
        assert_eq!(conn.reconnect.max_attempts, 4);
    }

    #[test]
    fn test_validation_errors() {
        for bad in [
            "[channel]\nurl = \"\"",
            "[store]\nmax_alerts = 0",
            "[reconnect]\nbase_delay_ms = 5000\nmax_delay_ms = 1000",
            "[reconnect]\njitter_ratio = 1.5",
        ] {
            assert!(
                matches!(ClientConfig::from_toml_str(bad), Err(ClientError::Config(_))),
                "expected config error for {bad:?}"
            );
        }
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            ClientConfig::from_toml_str("[channel\nurl = 1"),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ClientConfig::from_file("/nonexistent/alertwire.toml"),
            Err(ClientError::Config(_))
        ));
    }
}
