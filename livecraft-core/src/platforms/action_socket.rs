// action_socket.rs

use std::sync::Arc;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, error, info, warn};

use crate::Error;
use livecraft_common::traits::ActionSink;
use super::{shutdown_signalled, ConnectionStatus, ReconnectPolicy};

const QUEUE_SIZE: usize = 1024;

/// Outbound socket for `"actions"` messages. `emit` only queues the frame;
/// a background writer owns the connection and reconnects with backoff.
/// Frames queued while disconnected go out after the next connect.
#[derive(Clone)]
pub struct WebSocketActionSink {
    tx: mpsc::Sender<String>,
    status: Arc<RwLock<ConnectionStatus>>,
}

impl WebSocketActionSink {
    pub fn spawn(
        url: &str,
        policy: ReconnectPolicy,
        shutdown_rx: watch::Receiver<bool>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_SIZE);
        let status = Arc::new(RwLock::new(ConnectionStatus::Disconnected));
        let writer = Writer {
            url: url.to_string(),
            policy,
            status: status.clone(),
        };
        let handle = tokio::spawn(writer.run(rx, shutdown_rx));
        (Self { tx, status }, handle)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.read().clone()
    }

    /// The text frame written for one emitted message.
    pub fn frame(event: &str, payload: Value) -> String {
        json!({ "event": event, "data": payload }).to_string()
    }
}

#[async_trait]
impl ActionSink for WebSocketActionSink {
    async fn emit(&self, event: &str, payload: Value) -> Result<(), Error> {
        self.tx
            .send(Self::frame(event, payload))
            .await
            .map_err(|_| Error::WebSocket("action socket writer has stopped".into()))
    }
}

struct Writer {
    url: String,
    policy: ReconnectPolicy,
    status: Arc<RwLock<ConnectionStatus>>,
}

impl Writer {
    fn set_status(&self, status: ConnectionStatus) {
        *self.status.write() = status;
    }

    async fn run(self, mut rx: mpsc::Receiver<String>, mut shutdown_rx: watch::Receiver<bool>) {
        let mut backoff = self.policy.backoff();

        'outer: loop {
            let attempt = tokio::select! {
                res = connect_async(self.url.as_str()) => res,
                _ = shutdown_signalled(&mut shutdown_rx) => break,
            };

            match attempt {
                Ok((ws, _)) => {
                    info!("[ActionSocket] connected → {}", self.url);
                    self.set_status(ConnectionStatus::Connected);
                    backoff.reset();
                    let (mut write, mut read) = ws.split();

                    loop {
                        tokio::select! {
                            frame = rx.recv() => {
                                let Some(text) = frame else {
                                    let _ = write.close().await;
                                    break 'outer;
                                };
                                if let Err(e) = write.send(Message::Text(text.into())).await {
                                    error!("[ActionSocket] dropping frame, send failed: {}", e);
                                    break;
                                }
                            }
                            incoming = read.next() => match incoming {
                                Some(Ok(Message::Ping(payload))) => {
                                    let _ = write.send(Message::Pong(payload)).await;
                                }
                                Some(Ok(Message::Close(_))) | None => {
                                    warn!("[ActionSocket] closed by peer.");
                                    break;
                                }
                                Some(Err(e)) => {
                                    error!("[ActionSocket] read error: {}", e);
                                    break;
                                }
                                Some(Ok(other)) => debug!("[ActionSocket] ignoring inbound {:?}", other),
                            },
                            _ = shutdown_signalled(&mut shutdown_rx) => {
                                let _ = write.close().await;
                                break 'outer;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!("[ActionSocket] connect error: {}", e);
                    self.set_status(ConnectionStatus::Error(e.to_string()));
                }
            }

            let delay = backoff.next_delay();
            warn!("[ActionSocket] reconnecting in {:?}", delay);
            self.set_status(ConnectionStatus::Reconnecting);
            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown_signalled(&mut shutdown_rx) => break,
            }
        }

        info!("[ActionSocket] writer stopped.");
        self.set_status(ConnectionStatus::Disconnected);
    }
}
