//! Prometheus metrics and structured logging for alertwire.
//!
//! - Prometheus metrics for channel state, reconnects, decoding and the store
//! - Structured logging with tracing (JSON in production, pretty otherwise)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
