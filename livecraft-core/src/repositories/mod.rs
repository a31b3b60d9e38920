// src/repositories/mod.rs

pub mod sqlite;

pub use sqlite::SqliteCollectionStore;
pub use livecraft_common::traits::store_traits::{CollectionStore, Record};
