// lib/src/storage_engine/mod.rs

pub mod inmemory_storage;
pub mod postgres_storage;
pub mod storage_engine;

pub use inmemory_storage::InMemoryStorage;
pub use postgres_storage::PostgresStorage;
pub use storage_engine::{
    ActivityStore, AnalyticsStore, AppointmentStore, CareStore, DirectoryStore, PrectaStorage,
    RecordStore, StorageEngine,
};

use std::sync::Arc;

use models::errors::PrectaResult;
use tracing::info;

use crate::config::{AppConfig, StorageEngineType};

/// Creates the storage engine selected by `config.storage.engine`, connects it
/// and, when `migrate_on_start` is set, brings its schema up to date.
pub async fn open_storage(config: &AppConfig) -> PrectaResult<Arc<dyn PrectaStorage>> {
    let storage: Arc<dyn PrectaStorage> = match config.storage.engine {
        StorageEngineType::Postgres => Arc::new(PostgresStorage::new(&config.storage)?),
        StorageEngineType::Memory => Arc::new(InMemoryStorage::new()),
    };

    storage.connect().await?;
    if config.storage.migrate_on_start {
        storage.migrate().await?;
    }
    info!("Storage engine {} ready", storage.engine_type());
    Ok(storage)
}
