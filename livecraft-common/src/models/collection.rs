// File: livecraft-common/src/models/collection.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// The named stores records live in. Each one maps to a database/store pair.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    CommentEvents,
    GiftEvents,
    BitsEvents,
    LikesEvents,
    Events,
    Actions,
    Bans,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::CommentEvents,
        Collection::GiftEvents,
        Collection::BitsEvents,
        Collection::LikesEvents,
        Collection::Events,
        Collection::Actions,
        Collection::Bans,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::CommentEvents => "commentEvents",
            Collection::GiftEvents => "giftEvents",
            Collection::BitsEvents => "bitsEvents",
            Collection::LikesEvents => "likesEvents",
            Collection::Events => "Events",
            Collection::Actions => "Actions",
            Collection::Bans => "Bans",
        }
    }

    pub fn config(&self) -> CollectionConfig {
        CollectionConfig {
            database_name: self.name().to_string(),
            store_name: self.name().to_string(),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| Error::Parse(format!("Unknown collection: {}", s)))
    }
}

/// Addresses one object store inside one database.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct CollectionConfig {
    pub database_name: String,
    pub store_name: String,
}

impl fmt::Display for CollectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.database_name, self.store_name)
    }
}

/// Non-negative integer key of a stored record.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Coerces a JSON id (number or numeric string) into a record id.
    pub fn parse(raw: &Value) -> Result<Self, Error> {
        match raw {
            Value::Number(n) => {
                if let Some(v) = n.as_u64() {
                    return Ok(RecordId(v));
                }
                match n.as_f64() {
                    Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
                        Ok(RecordId(f as u64))
                    }
                    _ => Err(Error::InvalidId(format!("{} is not a non-negative integer", n))),
                }
            }
            Value::String(s) => s.parse(),
            other => Err(Error::InvalidId(format!("{} is not numeric", other))),
        }
    }

    /// Reads the `id` field of a record, if it holds a valid id.
    pub fn of_record(record: &serde_json::Map<String, Value>) -> Option<Self> {
        record.get("id").and_then(|v| RecordId::parse(v).ok())
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl FromStr for RecordId {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(RecordId)
            .map_err(|_| Error::InvalidId(format!("'{}' is not numeric", s)))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RecordId {
    fn from(v: u64) -> Self {
        RecordId(v)
    }
}

/// Kind of mutation a store notification reports.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StoreOp {
    Save,
    Update,
    Delete,
    Clear,
}

impl StoreOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOp::Save => "save",
            StoreOp::Update => "update",
            StoreOp::Delete => "delete",
            StoreOp::Clear => "clear",
        }
    }
}

/// Published after a store write has committed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StoreNotification {
    pub op: StoreOp,
    pub config: CollectionConfig,
    pub data: Value,
}
