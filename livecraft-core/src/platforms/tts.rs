use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use crate::Error;
use livecraft_common::traits::TtsPlayer;

/// Sends speech requests to an HTTP TTS endpoint as
/// `{"text": ..., "playNow": ...}`.
pub struct HttpTtsPlayer {
    client: Client,
    url: String,
}

impl HttpTtsPlayer {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl TtsPlayer for HttpTtsPlayer {
    async fn speak(&self, text: &str, play_now: bool) -> Result<(), Error> {
        debug!("[TTS] POST {} (playNow={})", self.url, play_now);
        self.client
            .post(&self.url)
            .json(&json!({ "text": text, "playNow": play_now }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Used when no TTS endpoint is configured.
#[derive(Default)]
pub struct LogTtsPlayer;

#[async_trait]
impl TtsPlayer for LogTtsPlayer {
    async fn speak(&self, text: &str, play_now: bool) -> Result<(), Error> {
        info!("[TTS] {}{}", if play_now { "(now) " } else { "" }, text);
        Ok(())
    }
}
