// src/repositories/sqlite/mod.rs

pub mod collection;

pub use collection::SqliteCollectionStore;

use serde_json::Value;
use crate::Error;
use livecraft_common::traits::store_traits::Record;

/// Rebuilds a record from its row. The row id is authoritative over
/// whatever `id` the JSON happens to hold.
pub(crate) fn decode_record(id: i64, data: &str) -> Result<Record, Error> {
    let mut record = match serde_json::from_str::<Value>(data)? {
        Value::Object(map) => map,
        other => {
            return Err(Error::Parse(format!(
                "record {} is not a JSON object: {}",
                id, other
            )))
        }
    };
    record.insert("id".to_string(), Value::from(id));
    Ok(record)
}
