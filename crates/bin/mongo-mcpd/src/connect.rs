use std::fs;
use std::path::Path;

use mongo_mcp_core::services::{CollectionHandle, CollectionTarget, ConnectError};
use mongo_mcp_core::store::{MemoryCollection, MongoCollection, StoreError};
use tracing::{error, info};

use crate::config::{ConfigError, DaemonConfig};

fn target(config: &DaemonConfig) -> CollectionTarget {
    CollectionTarget::new(&config.db_name, &config.collection_name)
}

/// Connects to MongoDB once. Failures leave the daemon running with a
/// disconnected handle so health probes and tool calls can report them.
pub async fn connect_mongo(config: &DaemonConfig) -> CollectionHandle<MongoCollection> {
    let target = target(config);
    let store = match MongoCollection::connect(
        &config.mongo_uri,
        &config.db_name,
        &config.collection_name,
        config.connect_timeout,
    )
    .await
    {
        Ok(store) => store,
        Err(err) => {
            let err = ConnectError::InvalidUri(err);
            error!("{err}");
            return CollectionHandle::disconnected(target, err.to_string());
        }
    };

    CollectionHandle::establish(target, store).await
}

/// Builds the in-memory development collection, seeded from `DB_SEED_FILE`
/// when one is configured.
pub async fn connect_memory(
    config: &DaemonConfig,
) -> Result<CollectionHandle<MemoryCollection>, ConfigError> {
    let store = match config.db_seed_file.as_deref() {
        Some(path) => load_seed(path)?,
        None => MemoryCollection::new(),
    };
    info!(
        "using in-memory collection '{}' with {} documents",
        config.collection_name,
        store.len().await
    );
    Ok(CollectionHandle::establish(target(config), store).await)
}

fn load_seed(path: &Path) -> Result<MemoryCollection, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidSetting {
        name: "DB_SEED_FILE",
        value: format!("{}: {message}", path.display()),
    };
    let text = fs::read_to_string(path).map_err(|err| invalid(err.to_string()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|err| invalid(err.to_string()))?;
    MemoryCollection::from_json(value).map_err(|err: StoreError| invalid(err.to_string()))
}
