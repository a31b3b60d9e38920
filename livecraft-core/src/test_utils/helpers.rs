// File: livecraft-core/src/test_utils/helpers.rs

use std::sync::Arc;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::Error;
use crate::db::Database;
use livecraft_common::models::{EventData, EventKind, LiveEvent};
use livecraft_common::traits::store_traits::Record;
use livecraft_common::traits::{ActionSink, TtsPlayer};

/// A migrated in-memory database, private to the caller.
pub async fn setup_test_database() -> Result<Database, Error> {
    let db = Database::new(":memory:").await?;
    db.migrate().await?;
    Ok(db)
}

/// Builds a record from a `json!` object literal. Anything else yields an
/// empty record.
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

pub fn chat_event(nickname: &str, comment: &str) -> LiveEvent {
    LiveEvent::new(
        EventKind::Chat,
        EventData {
            unique_id: nickname.to_lowercase(),
            nickname: nickname.to_string(),
            comment: Some(comment.to_string()),
            ..Default::default()
        },
    )
}

pub fn gift_event(nickname: &str, gift_name: &str, diamond_count: i64) -> LiveEvent {
    LiveEvent::new(
        EventKind::Gift,
        EventData {
            unique_id: nickname.to_lowercase(),
            nickname: nickname.to_string(),
            gift_name: Some(gift_name.to_string()),
            diamond_count: Some(diamond_count),
            repeat_count: Some(1),
            ..Default::default()
        },
    )
}

pub fn bits_event(nickname: &str, bits_amount: i64) -> LiveEvent {
    LiveEvent::new(
        EventKind::Bits,
        EventData {
            unique_id: nickname.to_lowercase(),
            nickname: nickname.to_string(),
            bits_amount: Some(bits_amount),
            ..Default::default()
        },
    )
}

/// Remembers every emitted `(event, payload)` pair.
#[derive(Default, Clone)]
pub struct RecordingSink {
    pub emitted: Arc<Mutex<Vec<(String, Value)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.emitted.lock().iter().map(|(_, p)| p.clone()).collect()
    }
}

#[async_trait]
impl ActionSink for RecordingSink {
    async fn emit(&self, event: &str, payload: Value) -> Result<(), Error> {
        self.emitted.lock().push((event.to_string(), payload));
        Ok(())
    }
}

/// Remembers every `(text, play_now)` it was asked to speak.
#[derive(Default, Clone)]
pub struct RecordingTts {
    pub spoken: Arc<Mutex<Vec<(String, bool)>>>,
}

impl RecordingTts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<(String, bool)> {
        self.spoken.lock().clone()
    }
}

#[async_trait]
impl TtsPlayer for RecordingTts {
    async fn speak(&self, text: &str, play_now: bool) -> Result<(), Error> {
        self.spoken.lock().push((text.to_string(), play_now));
        Ok(())
    }
}
