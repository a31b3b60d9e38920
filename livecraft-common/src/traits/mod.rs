// File: livecraft-common/src/traits/mod.rs
pub mod store_traits;
pub mod effect_traits;

pub use store_traits::CollectionStore;
pub use effect_traits::{ActionSink, TtsPlayer};
