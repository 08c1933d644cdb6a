//! Client error types.
//!
//! Only configuration and diagnostic paths return these; the facade's
//! alert operations never fail.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Diagnostic trigger rejected: status={status}, body={body}")]
    Trigger { status: u16, body: String },
}

pub type ClientResult<T> = Result<T, ClientError>;
