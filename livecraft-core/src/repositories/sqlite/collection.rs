// src/repositories/sqlite/collection.rs

use std::sync::Arc;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{Pool, Row, Sqlite, SqliteConnection};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::Error;
use crate::eventbus::{BusEvent, EventBus};
use super::decode_record;
use livecraft_common::models::collection::{CollectionConfig, RecordId, StoreNotification, StoreOp};
use livecraft_common::traits::store_traits::{CollectionStore, Record};

/// One collection inside the `records` table.
pub struct SqliteCollectionStore {
    pool: Pool<Sqlite>,
    config: CollectionConfig,
    write_lock: Arc<Mutex<()>>,
    event_bus: Option<Arc<EventBus>>,
}

impl SqliteCollectionStore {
    pub fn new(
        pool: Pool<Sqlite>,
        config: CollectionConfig,
        write_lock: Arc<Mutex<()>>,
        event_bus: Option<Arc<EventBus>>,
    ) -> Self {
        Self {
            pool,
            config,
            write_lock,
            event_bus,
        }
    }

    async fn notify(&self, op: StoreOp, data: Value) {
        if let Some(bus) = &self.event_bus {
            bus.publish(BusEvent::Store(StoreNotification {
                op,
                config: self.config.clone(),
                data,
            }))
            .await;
        }
    }

    async fn existing_ids(&self, conn: &mut SqliteConnection) -> Result<Vec<u64>, Error> {
        let rows = sqlx::query(
            "SELECT id FROM records WHERE database_name = ? AND store_name = ? ORDER BY id",
        )
        .bind(&self.config.database_name)
        .bind(&self.config.store_name)
        .fetch_all(&mut *conn)
        .await?;

        rows.iter()
            .map(|r| r.try_get::<i64, _>("id").map(|id| id as u64).map_err(Error::from))
            .collect()
    }

    async fn fetch_one(&self, conn: &mut SqliteConnection, id: RecordId) -> Result<Option<Record>, Error> {
        let row = sqlx::query(
            "SELECT id, data FROM records WHERE database_name = ? AND store_name = ? AND id = ?",
        )
        .bind(&self.config.database_name)
        .bind(&self.config.store_name)
        .bind(to_sql_id(id)?)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => {
                let id: i64 = row.try_get("id")?;
                let data: String = row.try_get("data")?;
                Ok(Some(decode_record(id, &data)?))
            }
            None => Ok(None),
        }
    }

    async fn write(&self, conn: &mut SqliteConnection, id: RecordId, record: &Record) -> Result<(), Error> {
        let data = serde_json::to_string(record)?;
        sqlx::query(
            r#"
            INSERT INTO records (database_name, store_name, id, data, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (database_name, store_name, id)
            DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.config.database_name)
        .bind(&self.config.store_name)
        .bind(to_sql_id(id)?)
        .bind(data)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

fn to_sql_id(id: RecordId) -> Result<i64, Error> {
    i64::try_from(id.value()).map_err(|_| Error::InvalidId(format!("{} is out of range", id)))
}

/// Smallest non-negative integer missing from `sorted_ids`, or one past
/// the largest when there are no gaps.
pub fn next_free_id(sorted_ids: &[u64]) -> u64 {
    let mut expected = 0u64;
    for &id in sorted_ids {
        if id == expected {
            expected += 1;
        } else if id > expected {
            break;
        }
    }
    expected
}

fn merge(mut base: Record, patch: Record) -> Record {
    for (k, v) in patch {
        base.insert(k, v);
    }
    base
}

#[async_trait]
impl CollectionStore for SqliteCollectionStore {
    fn config(&self) -> &CollectionConfig {
        &self.config
    }

    async fn save_data(&self, record: Record) -> Result<Record, Error> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let ids = self.existing_ids(&mut *tx).await?;
        let requested = RecordId::of_record(&record).filter(|id| ids.binary_search(&id.value()).is_ok());

        let (op, id, mut stored) = match requested {
            Some(id) => {
                let existing = self.fetch_one(&mut *tx, id).await?.unwrap_or_default();
                (StoreOp::Update, id, merge(existing, record))
            }
            None => (StoreOp::Save, RecordId(next_free_id(&ids)), record),
        };

        stored.insert("id".to_string(), Value::from(id.value()));
        self.write(&mut *tx, id, &stored).await?;
        tx.commit().await?;
        drop(_guard);

        debug!("{} record {} in {}", op.as_str(), id, self.config);
        self.notify(op, Value::Object(stored.clone())).await;
        Ok(stored)
    }

    async fn delete_data(&self, id: RecordId) -> Result<(), Error> {
        let _guard = self.write_lock.lock().await;
        sqlx::query("DELETE FROM records WHERE database_name = ? AND store_name = ? AND id = ?")
            .bind(&self.config.database_name)
            .bind(&self.config.store_name)
            .bind(to_sql_id(id)?)
            .execute(&self.pool)
            .await?;
        drop(_guard);

        debug!("deleted record {} from {}", id, self.config);
        self.notify(StoreOp::Delete, Value::from(id.value())).await;
        Ok(())
    }

    async fn get_all_data(&self) -> Result<Vec<Record>, Error> {
        let rows = sqlx::query(
            "SELECT id, data FROM records WHERE database_name = ? AND store_name = ? ORDER BY id",
        )
        .bind(&self.config.database_name)
        .bind(&self.config.store_name)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id: i64 = row.try_get("id")?;
                let data: String = row.try_get("data")?;
                decode_record(id, &data)
            })
            .collect()
    }

    async fn get_data_by_id(&self, id: RecordId) -> Result<Record, Error> {
        let mut conn = self.pool.acquire().await?;
        self.fetch_one(&mut *conn, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No record with id {} in {}", id, self.config)))
    }

    async fn update_data_by_id(&self, id: RecordId, patch: Record) -> Result<Record, Error> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let existing = self
            .fetch_one(&mut *tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No record with id {} in {}", id, self.config)))?;

        let mut updated = merge(existing, patch);
        updated.insert("id".to_string(), Value::from(id.value()));
        self.write(&mut *tx, id, &updated).await?;
        tx.commit().await?;
        drop(_guard);

        self.notify(StoreOp::Update, Value::Object(updated.clone())).await;
        Ok(updated)
    }

    async fn clear_database(&self) -> Result<(), Error> {
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query("DELETE FROM records WHERE database_name = ? AND store_name = ?")
            .bind(&self.config.database_name)
            .bind(&self.config.store_name)
            .execute(&self.pool)
            .await?;
        drop(_guard);

        info!("cleared {} records from {}", result.rows_affected(), self.config);
        self.notify(StoreOp::Clear, Value::Null).await;
        Ok(())
    }
}
