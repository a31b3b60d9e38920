//! Runtime settings for the rule pipeline.

use url::Url;

use crate::Error;
use crate::platforms::ReconnectPolicy;
use livecraft_common::models::FieldValidation;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Path of the sqlite file, or `:memory:`.
    pub database_url: String,
    /// Socket the live platform events arrive on.
    pub live_source_url: String,
    /// Socket `"actions"` messages are written to.
    pub action_socket_url: String,
    /// HTTP TTS endpoint. Speech is only logged when unset.
    pub tts_url: Option<String>,
    pub reconnect: ReconnectPolicy,
    pub field_validation: FieldValidation,
}

/// `<local data dir>/livecraft/livecraft.db`, or `data/livecraft.db` when the
/// platform has no data directory.
pub fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|dir| dir.join("livecraft").join("livecraft.db"))
        .and_then(|path| path.to_str().map(str::to_string))
        .unwrap_or_else(|| "data/livecraft.db".to_string())
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_path(),
            live_source_url: "ws://127.0.0.1:21213".to_string(),
            action_socket_url: "ws://127.0.0.1:8000".to_string(),
            tts_url: None,
            reconnect: ReconnectPolicy::default(),
            field_validation: FieldValidation::default(),
        }
    }
}

fn check_url(field: &str, value: &str, schemes: &[&str]) -> Result<Url, Error> {
    let url = Url::parse(value).map_err(|e| Error::Config(format!("{field}: '{value}' is not a URL ({e})")))?;
    if !schemes.contains(&url.scheme()) {
        return Err(Error::Config(format!(
            "{field}: scheme '{}' not allowed, expected one of {:?}",
            url.scheme(),
            schemes
        )));
    }
    Ok(url)
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.database_url.trim().is_empty() {
            return Err(Error::Config("database_url is empty".into()));
        }
        check_url("live_source_url", &self.live_source_url, &["ws", "wss"])?;
        check_url("action_socket_url", &self.action_socket_url, &["ws", "wss"])?;
        if let Some(tts) = &self.tts_url {
            check_url("tts_url", tts, &["http", "https"])?;
        }
        if self.reconnect.initial.is_zero() || self.reconnect.max < self.reconnect.initial {
            return Err(Error::Config(format!(
                "reconnect delays must satisfy 0 < initial <= max (got {:?} / {:?})",
                self.reconnect.initial, self.reconnect.max
            )));
        }
        Ok(())
    }
}
