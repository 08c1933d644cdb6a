//! Push channel transport for alertwire.
//!
//! Provides a single persistent WebSocket connection with:
//! - An explicit connection state machine (idle/connecting/connected/disconnected)
//! - Automatic reconnection with capped exponential backoff and jitter
//! - Ping/pong liveness detection
//! - Inline, in-order delivery of data frames to a `FrameSink`

pub mod backoff;
pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod state;

pub use backoff::ReconnectPolicy;
pub use connection::{ConnectionConfig, FrameSink, Transport};
pub use error::{TransportError, TransportResult};
pub use heartbeat::{Liveness, LivenessCheck};
pub use state::{ConnectionState, StateMachine};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any `wss://` or `https://` connection is made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
