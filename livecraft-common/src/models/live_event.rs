// File: livecraft-common/src/models/live_event.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::models::collection::Collection;
use crate::models::lenient::{array_or_empty, loose_integer, text_or_empty, truthy};

/// Live event types that have a rule collection behind them.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Chat,
    Gift,
    Bits,
    Likes,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [EventKind::Chat, EventKind::Gift, EventKind::Bits, EventKind::Likes];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Chat => "chat",
            EventKind::Gift => "gift",
            EventKind::Bits => "bits",
            EventKind::Likes => "likes",
        }
    }

    /// The collection holding the rules evaluated for this event type.
    pub fn collection(&self) -> Collection {
        match self {
            EventKind::Chat => Collection::CommentEvents,
            EventKind::Gift => Collection::GiftEvents,
            EventKind::Bits => Collection::BitsEvents,
            EventKind::Likes => Collection::LikesEvents,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(EventKind::Chat),
            "gift" => Ok(EventKind::Gift),
            "bits" => Ok(EventKind::Bits),
            "likes" => Ok(EventKind::Likes),
            _ => Err(Error::Parse(format!("Unknown event kind: {}", s))),
        }
    }
}

/// Payload of a live platform event. Only the fields the rule tables look at
/// are typed, everything else is kept in `extra` for template substitution.
/// Typed fields read loosely: null takes the default and amounts may arrive
/// as numeric strings.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    #[serde(default, deserialize_with = "text_or_empty")]
    pub unique_id: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub nickname: String,
    #[serde(default, deserialize_with = "truthy")]
    pub is_subscriber: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub is_moderator: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub is_new_gifter: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gift_name: Option<String>,
    #[serde(default, deserialize_with = "loose_integer", skip_serializing_if = "Option::is_none")]
    pub diamond_count: Option<i64>,
    #[serde(default, deserialize_with = "loose_integer", skip_serializing_if = "Option::is_none")]
    pub repeat_count: Option<i64>,
    #[serde(default, deserialize_with = "loose_integer", skip_serializing_if = "Option::is_none")]
    pub bits_amount: Option<i64>,
    #[serde(default, deserialize_with = "loose_integer", skip_serializing_if = "Option::is_none")]
    pub like_count: Option<i64>,
    #[serde(default, deserialize_with = "array_or_empty", skip_serializing_if = "Vec::is_empty")]
    pub emotes: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveEvent {
    pub kind: EventKind,
    pub data: EventData,
}

impl LiveEvent {
    pub fn new(kind: EventKind, data: EventData) -> Self {
        Self { kind, data }
    }

    pub fn has_emotes(&self) -> bool {
        !self.data.emotes.is_empty()
    }

    pub fn is_gift_related(&self) -> bool {
        self.kind == EventKind::Gift
    }

    /// The event payload as a JSON object, the shape forwarded to the socket.
    pub fn data_json(&self) -> Value {
        serde_json::to_value(&self.data).unwrap_or(Value::Object(Map::new()))
    }
}

/// One decoded frame from the live event socket.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveFrame {
    Event(LiveEvent),
    /// Events with no rule collection (follow, share, member, ...).
    Other { name: String, data: Value },
}

#[derive(Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

impl LiveFrame {
    /// Decodes a `{"event": "<name>", "data": {...}}` text frame.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let raw: RawFrame = serde_json::from_str(text)?;
        match raw.event.parse::<EventKind>() {
            Ok(kind) => {
                let data = if raw.data.is_null() {
                    EventData::default()
                } else {
                    serde_json::from_value(raw.data)?
                };
                Ok(LiveFrame::Event(LiveEvent::new(kind, data)))
            }
            Err(_) => Ok(LiveFrame::Other { name: raw.event, data: raw.data }),
        }
    }
}
