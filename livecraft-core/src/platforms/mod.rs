// File: src/platforms/mod.rs

pub mod backoff;
pub mod live_source;
pub mod action_socket;
pub mod tts;

pub use backoff::{Backoff, ReconnectPolicy};
pub use live_source::LiveEventSource;
pub use action_socket::WebSocketActionSink;
pub use tts::{HttpTtsPlayer, LogTtsPlayer};

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting,
    Error(String),
}

/// Resolves once the bus signals shutdown, or when the bus is gone.
pub(crate) async fn shutdown_signalled(rx: &mut tokio::sync::watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
