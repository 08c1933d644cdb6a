//! Push frame decoding.
//!
//! Frames are JSON objects with the fields `type`, `title`, `message`,
//! `priority`, `timestamp`, `risk_score`, `sector`, `region` and `id`.
//! Only `message` is required; everything else is filled in leniently.

use crate::error::{DecodeError, FeedResult};
use alertwire_core::{Alert, AlertKind, AlertPriority};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Epoch values above this are taken as milliseconds, below as seconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 100_000_000_000.0;

/// Decode counters.
#[derive(Debug, Default)]
pub struct DecodeStats {
    decoded: AtomicU64,
    rejected: AtomicU64,
}

impl DecodeStats {
    pub fn record_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decoded(&self) -> u64 {
        self.decoded.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

/// Frame decoder with failure accounting.
#[derive(Debug, Default)]
pub struct AlertDecoder {
    stats: DecodeStats,
}

impl AlertDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one frame, counting the result.
    pub fn decode(&self, payload: &[u8], received_at: DateTime<Utc>) -> FeedResult<Alert> {
        match decode_frame(payload, received_at) {
            Ok(alert) => {
                self.stats.record_decoded();
                debug!(id = %alert.id, kind = %alert.kind, "Decoded alert");
                Ok(alert)
            }
            Err(e) => {
                self.stats.record_rejected();
                warn!(
                    reason = e.reason(),
                    error = %e,
                    bytes = payload.len(),
                    "Discarding malformed alert frame"
                );
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }
}

/// Decode a raw frame into an unread `Alert`.
///
/// `received_at` is used when the frame carries no usable timestamp.
pub fn decode_frame(payload: &[u8], received_at: DateTime<Utc>) -> FeedResult<Alert> {
    let value: Value = serde_json::from_slice(payload)?;
    let Value::Object(fields) = value else {
        return Err(DecodeError::NotAnObject);
    };

    let message = non_blank_str(&fields, "message").ok_or(DecodeError::MissingMessage)?;

    let kind = fields
        .get("type")
        .and_then(Value::as_str)
        .map(AlertKind::from_wire)
        .unwrap_or_default();

    let id = match fields.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => Alert::generate_id(),
    };

    let title = non_blank_str(&fields, "title")
        .unwrap_or(kind.as_str())
        .to_string();

    let timestamp = fields
        .get("timestamp")
        .and_then(parse_timestamp)
        .unwrap_or(received_at);

    Ok(Alert {
        id,
        kind,
        title,
        message: message.to_string(),
        priority: fields
            .get("priority")
            .and_then(Value::as_str)
            .and_then(AlertPriority::from_wire),
        timestamp,
        risk_score: fields.get("risk_score").and_then(parse_score),
        sector: non_blank_str(&fields, "sector").map(str::to_string),
        region: non_blank_str(&fields, "region").map(str::to_string),
        read: false,
    })
}

fn non_blank_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// RFC 3339, naive ISO 8601 (taken as UTC), or epoch seconds/milliseconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Some(ts.with_timezone(&Utc));
            }
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => {
            let raw = n.as_f64()?;
            if !raw.is_finite() || raw < 0.0 {
                return None;
            }
            let millis = if raw >= EPOCH_MILLIS_THRESHOLD {
                raw
            } else {
                raw * 1000.0
            };
            Utc.timestamp_millis_opt(millis as i64).single()
        }
        _ => None,
    }
}

fn parse_score(value: &Value) -> Option<f64> {
    let score = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    score.is_finite().then_some(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_decode_full_frame() {
        let raw = br#"{
            "id": "tip-42",
            "type": "high_risk_tip",
            "title": "High-risk tip",
            "message": "Pump scheme detected",
            "priority": "high",
            "timestamp": "2024-02-29T08:30:00Z",
            "risk_score": 87.5,
            "sector": "crypto",
            "region": "Mumbai"
        }"#;

        let alert = decode_frame(raw, received()).unwrap();
        assert_eq!(alert.id, "tip-42");
        assert_eq!(alert.kind, AlertKind::HighRiskTip);
        assert_eq!(alert.title, "High-risk tip");
        assert_eq!(alert.message, "Pump scheme detected");
        assert_eq!(alert.priority, Some(AlertPriority::High));
        assert_eq!(alert.timestamp.day(), 29);
        assert_eq!(alert.risk_score, Some(87.5));
        assert_eq!(alert.sector.as_deref(), Some("crypto"));
        assert_eq!(alert.region.as_deref(), Some("Mumbai"));
        assert!(!alert.read);
    }

    #[test]
    fn test_decode_minimal_frame_fills_defaults() {
        let alert = decode_frame(br#"{"message": "hello"}"#, received()).unwrap();
        assert_eq!(alert.kind, AlertKind::Generic);
        assert_eq!(alert.title, "generic");
        assert_eq!(alert.timestamp, received());
        assert!(alert.priority.is_none());
        assert!(!alert.id.is_empty());
    }

    #[test]
    fn test_title_defaults_to_type() {
        let alert = decode_frame(
            br#"{"type": "fraud_chain_update", "message": "chain grew"}"#,
            received(),
        )
        .unwrap();
        assert_eq!(alert.title, "fraud_chain_update");
    }

    #[test]
    fn test_unknown_type_and_priority() {
        let alert = decode_frame(
            br#"{"type": "satellite_anomaly", "priority": "critical", "message": "x"}"#,
            received(),
        )
        .unwrap();
        assert_eq!(alert.kind, AlertKind::Generic);
        assert!(alert.priority.is_none());
    }

    #[test]
    fn test_missing_message_rejected() {
        let err = decode_frame(br#"{"type": "high_risk_tip"}"#, received()).unwrap_err();
        assert!(matches!(err, DecodeError::MissingMessage));

        let err = decode_frame(br#"{"message": "   "}"#, received()).unwrap_err();
        assert!(matches!(err, DecodeError::MissingMessage));

        let err = decode_frame(br#"{"message": 42}"#, received()).unwrap_err();
        assert!(matches!(err, DecodeError::MissingMessage));
    }

    #[test]
    fn test_invalid_payloads_rejected() {
        assert!(matches!(
            decode_frame(b"not json", received()),
            Err(DecodeError::InvalidJson(_))
        ));
        assert!(matches!(
            decode_frame(b"[1, 2]", received()),
            Err(DecodeError::NotAnObject)
        ));
        assert!(matches!(
            decode_frame(&[0xff, 0xfe], received()),
            Err(DecodeError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_numeric_id_and_string_score() {
        let alert = decode_frame(
            br#"{"id": 1234, "message": "m", "risk_score": "0.75"}"#,
            received(),
        )
        .unwrap();
        assert_eq!(alert.id, "1234");
        assert_eq!(alert.risk_score, Some(0.75));
    }

    #[test]
    fn test_timestamp_formats() {
        let naive = decode_frame(
            br#"{"message": "m", "timestamp": "2024-02-29T08:30:00.123456"}"#,
            received(),
        )
        .unwrap();
        assert_eq!(naive.timestamp.day(), 29);

        let millis = decode_frame(
            br#"{"message": "m", "timestamp": 1709280000000}"#,
            received(),
        )
        .unwrap();
        assert_eq!(millis.timestamp.timestamp(), 1_709_280_000);

        let seconds = decode_frame(
            br#"{"message": "m", "timestamp": 1709280000.5}"#,
            received(),
        )
        .unwrap();
        assert_eq!(seconds.timestamp.timestamp(), 1_709_280_000);

        let garbage = decode_frame(br#"{"message": "m", "timestamp": "yesterday"}"#, received())
            .unwrap();
        assert_eq!(garbage.timestamp, received());
    }

    #[test]
    fn test_decoder_counts_outcomes() {
        let decoder = AlertDecoder::new();
        assert!(decoder.decode(br#"{"message": "ok"}"#, received()).is_ok());
        assert!(decoder.decode(br#"{"title": "no body"}"#, received()).is_err());
        assert!(decoder.decode(b"{", received()).is_err());

        assert_eq!(decoder.stats().decoded(), 1);
        assert_eq!(decoder.stats().rejected(), 2);
    }

    #[test]
    fn test_reason_labels() {
        assert_eq!(DecodeError::MissingMessage.reason(), "missing_message");
        assert_eq!(DecodeError::NotAnObject.reason(), "not_an_object");
    }
}
