//! Real-time fraud alert client.
//!
//! Ties the push channel transport, the alert decoder and the alert store
//! together behind `AlertClient`, the only surface consumers use:
//! - `connect()` / `disconnect()` and the connection state signal
//! - `alerts()`, `unread_count()`, `mark_as_read()`, `clear_alerts()`
//! - `inject_test_alert()` for diagnostic tooling
//!
//! `DiagnosticTrigger` asks the backend to evaluate a test item; any alert
//! it produces arrives over the push channel like every other alert.

pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;

pub use client::{AlertClient, ClientSubscription, TestAlert};
pub use config::ClientConfig;
pub use diagnostics::{DiagnosticTrigger, TestTip, TriggerResponse};
pub use error::{ClientError, ClientResult};

pub use alertwire_core::{Alert, AlertKind, AlertPriority};
pub use alertwire_feed::StoreEvent;
pub use alertwire_ws::ConnectionState;
