use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::models::collection::{CollectionConfig, RecordId};

pub type Record = Map<String, Value>;

/// CRUD access to one keyed collection of JSON records.
///
/// Ids are non-negative integers. Saving a record without a usable id (or
/// with an id nothing uses yet) assigns the smallest unused id, so deleted
/// ids are handed out again before the collection grows past its maximum.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    fn config(&self) -> &CollectionConfig;

    /// Inserts or updates. Returns the record as persisted, `id` included.
    async fn save_data(&self, record: Record) -> Result<Record, Error>;

    async fn delete_data(&self, id: RecordId) -> Result<(), Error>;

    /// All records, ascending by id.
    async fn get_all_data(&self) -> Result<Vec<Record>, Error>;

    async fn get_data_by_id(&self, id: RecordId) -> Result<Record, Error>;

    /// Merges `patch` into an existing record, keeping its id.
    async fn update_data_by_id(&self, id: RecordId, patch: Record) -> Result<Record, Error>;

    async fn clear_database(&self) -> Result<(), Error>;

    /// Records whose id is in `ids`. Unknown ids are ignored.
    async fn filter_items_by_ids(&self, ids: &[u64]) -> Result<Vec<Record>, Error> {
        let wanted: std::collections::HashSet<u64> = ids.iter().copied().collect();
        let all = self.get_all_data().await?;
        Ok(all
            .into_iter()
            .filter(|r| RecordId::of_record(r).is_some_and(|id| wanted.contains(&id.value())))
            .collect())
    }
}
