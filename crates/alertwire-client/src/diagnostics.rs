//! Diagnostic trigger.
//!
//! Submits a test item to the backend, which scores it and pushes an alert
//! over the channel if it crosses the risk threshold. The result here is
//! only the backend's evaluation; the alert itself arrives as a frame.

use crate::config::DiagnosticsConfig;
use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Item submitted for evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct TestTip {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl TestTip {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sector: None,
            region: None,
        }
    }
}

/// Backend evaluation of a submitted item.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerResponse {
    #[serde(default)]
    pub risk_score: Option<f64>,
    /// Whether the backend pushed an alert for this item.
    #[serde(default, alias = "alert_triggered")]
    pub alert_sent: bool,
    /// Anything else the backend returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// HTTP client for the diagnostic endpoint.
pub struct DiagnosticTrigger {
    http: reqwest::Client,
    url: String,
}

impl DiagnosticTrigger {
    pub fn new(config: &DiagnosticsConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self {
            http,
            url: config.trigger_url.clone(),
        })
    }

    pub async fn submit(&self, tip: &TestTip) -> ClientResult<TriggerResponse> {
        debug!(url = %self.url, "Submitting diagnostic item");
        let response = self.http.post(&self.url).json(tip).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Trigger {
                status: status.as_u16(),
                body,
            });
        }

        let evaluation: TriggerResponse = response.json().await?;
        info!(
            risk_score = ?evaluation.risk_score,
            alert_sent = evaluation.alert_sent,
            "Diagnostic item evaluated"
        );
        Ok(evaluation)
    }
}
