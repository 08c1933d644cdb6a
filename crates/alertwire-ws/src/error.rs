//! Transport error types.
//!
//! These never leave the crate's public connect/disconnect surface; a
//! failed session only shows up as the `Disconnected` state.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection closed: code={code}, reason={reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("Heartbeat timeout")]
    HeartbeatTimeout,

    #[error("Tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
}

impl TransportError {
    /// Short label used for metrics and log fields.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ConnectionClosed { .. } => "closed",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::Tungstenite(_) => "transport_error",
        }
    }
}

pub type TransportResult<T> = Result<T, TransportError>;
