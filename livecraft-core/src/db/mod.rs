// livecraft-core/src/db/mod.rs

use std::str::FromStr;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::Error;
use crate::eventbus::EventBus;
use crate::repositories::sqlite::SqliteCollectionStore;
use livecraft_common::traits::CollectionStore;
use livecraft_common::models::collection::{Collection, CollectionConfig};
use livecraft_common::traits::store_traits::Record;

/// Sqlite-backed record database holding every collection.
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
    write_lock: Arc<Mutex<()>>,
}

impl Database {
    /// Opens (creating if needed) the database at `database_url`.
    /// `:memory:` opens a private in-memory database.
    pub async fn new(database_url: &str) -> Result<Self, Error> {
        let pool = if database_url == ":memory:" || database_url == "sqlite::memory:" {
            // Each connection to :memory: is its own database, so keep one.
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await?
        } else {
            let options = if database_url.starts_with("sqlite:") {
                SqliteConnectOptions::from_str(database_url)?
            } else {
                SqliteConnectOptions::new().filename(database_url)
            }
            .create_if_missing(true);
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        info!("Connected to SQLite database at {}", database_url);
        Ok(Self::from_pool(pool))
    }

    /// Run migrations in the `migrations/` folder.
    pub async fn migrate(&self) -> Result<(), Error> {
        info!("Applying migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Migrations applied successfully.");
        Ok(())
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// A store for one collection. Stores created from the same database
    /// share a write lock, so id assignment never races.
    pub fn collection(&self, collection: Collection, event_bus: Option<Arc<EventBus>>) -> SqliteCollectionStore {
        self.store_for(collection.config(), event_bus)
    }

    pub fn store_for(&self, config: CollectionConfig, event_bus: Option<Arc<EventBus>>) -> SqliteCollectionStore {
        SqliteCollectionStore::new(self.pool.clone(), config, self.write_lock.clone(), event_bus)
    }

    /// Every record of the collection. Failures are logged and read as an
    /// empty collection, so callers never have to handle them.
    pub async fn get_all_data_from_database(&self, config: &CollectionConfig) -> Vec<Record> {
        match self.store_for(config.clone(), None).get_all_data().await {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to read collection {}: {:?}", config, e);
                Vec::new()
            }
        }
    }

    /// When the collection was last written to, if it holds any records.
    pub async fn last_updated(&self, config: &CollectionConfig) -> Result<Option<DateTime<Utc>>, Error> {
        let row = sqlx::query(
            "SELECT MAX(updated_at) AS last FROM records WHERE database_name = ? AND store_name = ?",
        )
        .bind(&config.database_name)
        .bind(&config.store_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get::<Option<DateTime<Utc>>, _>("last")?)
    }
}
