//! Core domain types for alertwire.
//!
//! This crate provides the types shared by every layer of the alert client:
//! - `Alert`: a single push notification surfaced to the dashboard
//! - `AlertKind`: closed set of alert categories with a `Generic` fallback
//! - `AlertPriority`: optional low/medium/high badge

pub mod alert;

pub use alert::{Alert, AlertKind, AlertPriority, CONNECTED_MESSAGE};
