//! Connection state machine.
//!
//! `idle → connecting → connected → disconnected → connecting → …`, with
//! `idle` reachable again only through an explicit end of session.
//!
//! Every transition goes through the `watch` channel's own lock. Ending a
//! session cancels its token inside that lock, so a cancelled session can
//! never publish a transition afterwards.

use alertwire_telemetry::Metrics;
use parking_lot::Mutex;
use std::fmt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Push channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No session. Initial state and the result of `disconnect()`.
    #[default]
    Idle,
    /// Opening the channel.
    Connecting,
    /// Channel open, frames flowing.
    Connected,
    /// Channel lost; a reconnect is pending (or the policy gave up).
    Disconnected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }

    /// Connecting or connected.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owns the current state and the token of the running session.
pub struct StateMachine {
    tx: watch::Sender<ConnectionState>,
    session: Mutex<Option<CancellationToken>>,
}

impl StateMachine {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::Idle);
        Self {
            tx,
            session: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    /// Start a new session and move to `Connecting`.
    ///
    /// Returns `None` when a session is already connecting or connected.
    /// A session waiting out a backoff (`Disconnected`) is superseded.
    pub fn begin_session(&self) -> Option<CancellationToken> {
        let mut started = None;
        self.tx.send_if_modified(|state| {
            if state.is_active() {
                return false;
            }
            let token = CancellationToken::new();
            if let Some(previous) = self.session.lock().replace(token.clone()) {
                previous.cancel();
            }
            *state = ConnectionState::Connecting;
            Metrics::ws_state_set(state.as_str());
            started = Some(token);
            true
        });
        started
    }

    /// Cancel the running session (if any) and move to `Idle`.
    ///
    /// Returns whether a session was cancelled.
    pub fn end_session(&self) -> bool {
        let mut cancelled = false;
        self.tx.send_if_modified(|state| {
            if let Some(token) = self.session.lock().take() {
                token.cancel();
                cancelled = true;
            }
            let changed = *state != ConnectionState::Idle;
            *state = ConnectionState::Idle;
            if changed {
                Metrics::ws_state_set(state.as_str());
            }
            changed
        });
        cancelled
    }

    /// Transition on behalf of `session`.
    ///
    /// Refused (returns `false`) once the session has been cancelled.
    pub fn advance(&self, session: &CancellationToken, to: ConnectionState) -> bool {
        let mut live = true;
        self.tx.send_if_modified(|state| {
            if session.is_cancelled() {
                live = false;
                return false;
            }
            if *state == to {
                return false;
            }
            debug!(from = %state, to = %to, "Connection state transition");
            *state = to;
            Metrics::ws_state_set(state.as_str());
            true
        });
        live
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
