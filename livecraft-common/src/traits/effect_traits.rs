use async_trait::async_trait;
use serde_json::Value;

use crate::error::Error;

/// Outbound socket the dispatcher emits named messages on.
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn emit(&self, event: &str, payload: Value) -> Result<(), Error>;
}

/// Text-to-speech playback.
#[async_trait]
pub trait TtsPlayer: Send + Sync {
    /// `play_now` asks the player to skip its queue.
    async fn speak(&self, text: &str, play_now: bool) -> Result<(), Error>;
}
