//! Mock push server for integration tests.
//!
//! Accepts WebSocket connections and lets a test push frames to every live
//! connection, drop them from the server side, and inspect what the client
//! sent back (close frames, pongs).

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

enum ServerCommand {
    Send(Message),
    Drop,
}

#[derive(Default)]
struct Shared {
    connections: u32,
    closes_received: u32,
    peers: Vec<mpsc::UnboundedSender<ServerCommand>>,
}

/// A mock alert push server.
pub struct MockPushServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    shared: Arc<Mutex<Shared>>,
}

impl MockPushServer {
    /// Start on an available local port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = Arc::new(Mutex::new(Shared::default()));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let shared_clone = shared.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(stream, shared_clone.clone()));
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            shared,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/ws/alerts", self.addr)
    }

    /// Completed handshakes so far.
    pub async fn connection_count(&self) -> u32 {
        self.shared.lock().await.connections
    }

    /// Close frames received from clients.
    pub async fn closes_received(&self) -> u32 {
        self.shared.lock().await.closes_received
    }

    /// Send a text frame to every live connection.
    pub async fn push_text(&self, text: impl Into<String>) {
        let text = text.into();
        let mut shared = self.shared.lock().await;
        shared
            .peers
            .retain(|peer| peer.send(ServerCommand::Send(Message::Text(text.clone()))).is_ok());
    }

    /// Send a raw frame to every live connection.
    pub async fn push(&self, message: Message) {
        let mut shared = self.shared.lock().await;
        shared
            .peers
            .retain(|peer| peer.send(ServerCommand::Send(message.clone())).is_ok());
    }

    /// Tear down every live connection without a close handshake.
    pub async fn drop_connections(&self) {
        let mut shared = self.shared.lock().await;
        for peer in shared.peers.drain(..) {
            let _ = peer.send(ServerCommand::Drop);
        }
    }

    pub async fn shutdown(self) {
        self.drop_connections().await;
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(stream: TcpStream, shared: Arc<Mutex<Shared>>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
    {
        let mut shared = shared.lock().await;
        shared.connections += 1;
        shared.peers.push(cmd_tx);
    }

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(ServerCommand::Send(message)) => {
                    if write.send(message).await.is_err() {
                        break;
                    }
                }
                Some(ServerCommand::Drop) | None => break,
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) => {
                    shared.lock().await.closes_received += 1;
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            },
        }
    }
}
