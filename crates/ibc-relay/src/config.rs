use std::path::PathBuf;
use std::sync::Arc;

use crate::store::{SQLiteStore, StoreError};

/// Default location of the relay database
pub const DEFAULT_DB_PATH: &str = "./.relay_data/relay.db";

/// Configuration shared by every relay command
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Path to the SQLite database holding tracked chains
    pub db_path: PathBuf,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

impl RelayConfig {
    pub async fn open_store(&self) -> Result<Arc<SQLiteStore>, StoreError> {
        Ok(Arc::new(SQLiteStore::single_writer(&self.db_path).await?))
    }
}
