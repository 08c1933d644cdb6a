//! Alert decoding and storage.
//!
//! - `AlertDecoder`: turns raw push frames into `Alert`s, discarding
//!   malformed frames and counting them
//! - `AlertStore`: most-recent-first, deduplicated, capped alert list with
//!   read tracking and change notifications

pub mod decoder;
pub mod error;
pub mod store;

pub use decoder::{decode_frame, AlertDecoder, DecodeStats};
pub use error::{DecodeError, FeedResult};
pub use store::{AlertStore, InsertOutcome, StoreEvent, DEFAULT_MAX_ALERTS};
