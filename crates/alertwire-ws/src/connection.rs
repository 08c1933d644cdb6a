//! Push channel transport.
//!
//! Owns the single WebSocket connection. `connect()` starts a session task
//! that opens the channel, delivers data frames to the `FrameSink` in
//! arrival order, and reconnects with backoff until `disconnect()`.

use crate::backoff::ReconnectPolicy;
use crate::error::{TransportError, TransportResult};
use crate::heartbeat::{Liveness, LivenessCheck};
use crate::state::{ConnectionState, StateMachine};
use alertwire_telemetry::Metrics;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Receives raw channel events from the transport.
///
/// Called inline from the session task, one frame at a time, in the order
/// the channel delivered them. Implementations must not block.
pub trait FrameSink: Send + Sync + 'static {
    /// The channel opened.
    fn on_open(&self);
    /// A Text or Binary frame arrived.
    fn on_frame(&self, payload: &[u8]);
}

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Push channel URL (`ws://` or `wss://`).
    pub url: String,
    /// Inbound silence before a liveness ping (0 = disabled).
    pub heartbeat_interval_ms: u64,
    /// How long a ping may go unanswered.
    pub heartbeat_timeout_ms: u64,
    /// Retry timing.
    pub reconnect: ReconnectPolicy,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            heartbeat_interval_ms: 30000,
            heartbeat_timeout_ms: 10000,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Push channel transport.
///
/// Dropping the transport ends any running session.
pub struct Transport {
    inner: Arc<Inner>,
}

struct Inner {
    config: ConnectionConfig,
    machine: StateMachine,
    sink: Arc<dyn FrameSink>,
    /// Consecutive failed attempts since the last successful open.
    attempts: AtomicU32,
}

impl Transport {
    pub fn new(config: ConnectionConfig, sink: Arc<dyn FrameSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                machine: StateMachine::new(),
                sink,
                attempts: AtomicU32::new(0),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.machine.state()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.machine.subscribe()
    }

    /// Consecutive failed attempts since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.attempts.load(Ordering::Acquire)
    }

    pub fn url(&self) -> &str {
        &self.inner.config.url
    }

    /// Open the channel.
    ///
    /// No-op while connecting or connected. Must be called from within a
    /// Tokio runtime; otherwise the call is logged and ignored.
    pub fn connect(&self) {
        let Ok(runtime) = Handle::try_current() else {
            error!("connect() called outside a Tokio runtime; ignoring");
            return;
        };

        let Some(session) = self.inner.machine.begin_session() else {
            debug!(state = %self.state(), "connect() ignored, session already active");
            return;
        };

        self.inner.attempts.store(0, Ordering::Release);
        info!(url = %self.inner.config.url, "Starting push channel session");
        runtime.spawn(Inner::run_session(self.inner.clone(), session));
    }

    /// Close the channel and cancel any pending reconnect.
    pub fn disconnect(&self) {
        if self.inner.machine.end_session() {
            info!("Push channel disconnect requested");
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.inner.machine.end_session();
    }
}

impl Inner {
    async fn run_session(self: Arc<Self>, session: CancellationToken) {
        loop {
            if !self.machine.advance(&session, ConnectionState::Connecting) {
                return;
            }

            let outcome = self.run_connection(&session).await;

            if session.is_cancelled() {
                debug!("Session cancelled, not reconnecting");
                return;
            }

            let reason = match &outcome {
                Ok(()) => "stream_ended",
                Err(e) => {
                    warn!(error = %e, "Push channel lost");
                    e.reason()
                }
            };

            let attempt = self.attempts.load(Ordering::Acquire);
            let retry = self.config.reconnect.should_retry(attempt);
            if retry {
                self.attempts.store(attempt + 1, Ordering::Release);
            }

            if !self.machine.advance(&session, ConnectionState::Disconnected) {
                return;
            }
            if !retry {
                error!(attempt, "Max reconnection attempts reached, giving up");
                return;
            }

            let delay = self.config.reconnect.delay(attempt);
            Metrics::ws_reconnect(reason, attempt + 1);
            warn!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                reason,
                "Reconnecting"
            );

            tokio::select! {
                biased;
                () = session.cancelled() => {
                    debug!("Reconnect timer cancelled");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Run one connection until it fails or the session is cancelled.
    ///
    /// `Ok(())` on cancellation; every other exit is an error.
    async fn run_connection(&self, session: &CancellationToken) -> TransportResult<()> {
        info!(url = %self.config.url, "Connecting to push channel");

        let ws_stream = tokio::select! {
            biased;
            () = session.cancelled() => return Ok(()),
            result = connect_async_tls_with_config(&self.config.url, None, true, None) => {
                let (ws_stream, _response) = result?;
                ws_stream
            }
        };
        let (mut write, mut read) = ws_stream.split();

        self.attempts.store(0, Ordering::Release);
        if !self.machine.advance(session, ConnectionState::Connected) {
            let _ = write.send(Message::Close(None)).await;
            return Ok(());
        }
        Metrics::ws_reconnect_reset();
        info!("Push channel connected");

        self.sink.on_open();

        let mut liveness = Liveness::new(
            self.config.heartbeat_interval_ms,
            self.config.heartbeat_timeout_ms,
            Instant::now(),
        );

        loop {
            let next_check = liveness.next_check();

            tokio::select! {
                biased;

                () = session.cancelled() => {
                    info!("Closing push channel");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(?e, "Failed to send Close frame");
                    }
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            liveness.record_inbound(Instant::now());
                            Metrics::frame_received();
                            self.sink.on_frame(text.as_bytes());
                        }
                        Some(Ok(Message::Binary(data))) => {
                            liveness.record_inbound(Instant::now());
                            Metrics::frame_received();
                            self.sink.on_frame(&data);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received ping, sending pong");
                            liveness.record_inbound(Instant::now());
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            liveness.record_pong(Instant::now());
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "Push channel closed by server");
                            return Err(TransportError::ConnectionClosed { code, reason });
                        }
                        Some(Ok(Message::Frame(_))) => {}
                        Some(Err(e)) => {
                            error!(?e, "Push channel read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("Push channel stream ended");
                            return Err(TransportError::ConnectionClosed {
                                code: 1006,
                                reason: "Stream ended".to_string(),
                            });
                        }
                    }
                }

                () = tokio::time::sleep_until(next_check), if liveness.is_enabled() => {
                    let now = Instant::now();
                    match liveness.poll(now) {
                        LivenessCheck::Healthy => {}
                        LivenessCheck::SendPing => {
                            write.send(Message::Ping(Vec::new())).await?;
                            liveness.record_ping(now);
                            debug!("Sent liveness ping");
                        }
                        LivenessCheck::TimedOut => {
                            error!("Heartbeat timeout");
                            return Err(TransportError::HeartbeatTimeout);
                        }
                    }
                }
            }
        }
    }
}
