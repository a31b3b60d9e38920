// live_source.rs

use std::sync::Arc;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use crate::Error;
use crate::eventbus::{BusEvent, EventBus};
use livecraft_common::models::LiveFrame;
use super::{shutdown_signalled, ConnectionStatus, ReconnectPolicy};

enum ReadEnd {
    Closed,
    Shutdown,
}

/// Client for the live platform's event socket. Decoded chat, gift, bits and
/// likes events are published on the bus as `BusEvent::Live`.
pub struct LiveEventSource {
    url: String,
    policy: ReconnectPolicy,
    event_bus: Arc<EventBus>,
    status: Arc<RwLock<ConnectionStatus>>,
}

impl LiveEventSource {
    pub fn new(url: &str, policy: ReconnectPolicy, event_bus: Arc<EventBus>) -> Self {
        Self {
            url: url.to_string(),
            policy,
            event_bus,
            status: Arc::new(RwLock::new(ConnectionStatus::Disconnected)),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.read().clone()
    }

    fn set_status(&self, status: ConnectionStatus) {
        *self.status.write() = status;
    }

    /// Keeps the socket connected until the bus shuts down, backing off
    /// between failed attempts.
    pub async fn start_loop(&self) -> Result<(), Error> {
        let mut backoff = self.policy.backoff();
        let mut shutdown_rx = self.event_bus.shutdown_rx.clone();

        loop {
            let attempt = tokio::select! {
                res = connect_async(self.url.as_str()) => res,
                _ = shutdown_signalled(&mut shutdown_rx) => break,
            };

            match attempt {
                Ok((ws, _)) => {
                    info!("[LiveSource] connected → {}", self.url);
                    self.set_status(ConnectionStatus::Connected);
                    backoff.reset();

                    match self.run_read_loop(ws, &mut shutdown_rx).await {
                        Ok(ReadEnd::Shutdown) => break,
                        Ok(ReadEnd::Closed) => info!("[LiveSource] socket closed by peer."),
                        Err(e) => {
                            error!("[LiveSource] read error: {}", e);
                            self.set_status(ConnectionStatus::Error(e.to_string()));
                        }
                    }
                }
                Err(e) => {
                    error!("[LiveSource] connect error: {}", e);
                    self.set_status(ConnectionStatus::Error(e.to_string()));
                }
            }

            let delay = backoff.next_delay();
            warn!("[LiveSource] reconnecting in {:?}", delay);
            self.set_status(ConnectionStatus::Reconnecting);
            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown_signalled(&mut shutdown_rx) => break,
            }
        }

        info!("[LiveSource] stopped.");
        self.set_status(ConnectionStatus::Disconnected);
        Ok(())
    }

    async fn run_read_loop(
        &self,
        ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<ReadEnd, Error> {
        let (mut write, mut read) = ws.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    let msg = match msg {
                        Some(res) => res.map_err(|e| Error::WebSocket(format!("ws error: {e}")))?,
                        None => return Ok(ReadEnd::Closed),
                    };
                    match msg {
                        Message::Text(txt) => {
                            self.handle_text(&txt).await;
                        }
                        Message::Ping(payload) => {
                            write
                                .send(Message::Pong(payload))
                                .await
                                .map_err(|e| Error::WebSocket(format!("pong failed: {e}")))?;
                        }
                        Message::Close(_) => return Ok(ReadEnd::Closed),
                        _ => {}
                    }
                }
                _ = shutdown_signalled(shutdown_rx) => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(ReadEnd::Shutdown);
                }
            }
        }
    }

    /// Decodes one text frame and publishes it if it is a rule-bearing
    /// event. Returns whether anything was published.
    pub async fn handle_text(&self, txt: &str) -> bool {
        match LiveFrame::parse(txt) {
            Ok(LiveFrame::Event(event)) => {
                trace!("[LiveSource] {} from {}", event.kind, event.data.unique_id);
                self.event_bus.publish(BusEvent::Live(event)).await;
                true
            }
            Ok(LiveFrame::Other { name, .. }) => {
                debug!("[LiveSource] ignoring '{}' event", name);
                false
            }
            Err(e) => {
                warn!("[LiveSource] undecodable frame: {:?}", e);
                false
            }
        }
    }
}
