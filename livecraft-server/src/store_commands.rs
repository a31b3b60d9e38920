use std::path::Path;
use anyhow::{bail, Context};
use serde_json::Value;
use tracing::{info, warn};

use livecraft_common::models::Collection;
use livecraft_core::Database;
use livecraft_core::repositories::{CollectionStore, SqliteCollectionStore};

async fn open_db(db_path: &str) -> anyhow::Result<Database> {
    let db = Database::new(db_path).await?;
    db.migrate().await?;
    Ok(db)
}

async fn open(db_path: &str, collection: &str) -> anyhow::Result<SqliteCollectionStore> {
    let collection: Collection = collection.parse()?;
    Ok(open_db(db_path).await?.collection(collection, None))
}

pub async fn list(db_path: &str, collection: &str) -> anyhow::Result<()> {
    let collection: Collection = collection.parse()?;
    let db = open_db(db_path).await?;
    let store = db.collection(collection, None);

    let records = store.get_all_data().await?;
    for record in &records {
        println!("{}", Value::Object(record.clone()));
    }
    match db.last_updated(store.config()).await? {
        Some(at) => info!("{} record(s) in {}, last written {}", records.len(), store.config(), at),
        None => info!("{} is empty", store.config()),
    }
    Ok(())
}

pub async fn export(db_path: &str, collection: &str, out: Option<&Path>) -> anyhow::Result<()> {
    let store = open(db_path, collection).await?;
    let records: Vec<Value> = store.get_all_data().await?.into_iter().map(Value::Object).collect();
    let text = serde_json::to_string_pretty(&records)?;

    match out {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            info!("Exported {} record(s) from {} to {}", records.len(), store.config(), path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

pub async fn import(db_path: &str, collection: &str, file: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let Value::Array(items) = serde_json::from_str::<Value>(&text)? else {
        bail!("{} does not contain a JSON array", file.display());
    };

    let store = open(db_path, collection).await?;
    let mut saved = 0;
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(record) => {
                store.save_data(record).await?;
                saved += 1;
            }
            other => warn!("Skipping entry {}: not an object ({})", index, other),
        }
    }
    info!("Imported {} record(s) into {}", saved, store.config());
    Ok(())
}

pub async fn clear(db_path: &str, collection: &str) -> anyhow::Result<()> {
    let store = open(db_path, collection).await?;
    store.clear_database().await?;
    Ok(())
}
