//! Feed error types.

use thiserror::Error;

/// Why a frame was discarded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Frame is not a JSON object")]
    NotAnObject,

    #[error("Frame has no usable message field")]
    MissingMessage,
}

impl DecodeError {
    /// Short label used for metrics and log fields.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "invalid_json",
            Self::NotAnObject => "not_an_object",
            Self::MissingMessage => "missing_message",
        }
    }
}

pub type FeedResult<T> = Result<T, DecodeError>;
