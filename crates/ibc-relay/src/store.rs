//! Persistence for tracked peer chains: one snapshot per chain plus every ingested block.

use std::collections::{BTreeMap, HashMap};
use std::ops::DerefMut;
use std::path::Path;

use async_trait::async_trait;
use ibc_block::{BlockHeader, Name};
use ibc_merkle::Digest;
use serde::{Deserialize, Serialize};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Acquire, Pool, Row, Sqlite, SqliteConnection};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;

/// An error that can occur when using the store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    SQLite(#[from] sqlx::Error),
    #[error("Custom error: {0:?}")]
    Custom(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl StoreError {
    fn custom(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Custom(Box::new(err))
    }
}

/// Persisted tracker state of one peer chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Name,
    /// First block appended to the accumulator
    pub first_block_num: u32,
    /// Last block appended to the accumulator
    pub head_block_num: u32,
    pub head_id: Digest,
    /// Packed accumulator over the ids of blocks `first_block_num..=head_block_num`.
    /// Kept packed so that loading always goes through the frontier validator.
    #[serde(with = "hex_bytes")]
    pub frontier: Vec<u8>,
}

/// An ingested block together with the accumulator root right after its id was appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub block_num: u32,
    pub id: Digest,
    pub root: Digest,
    pub header: BlockHeader,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackerStore: Send + Sync {
    /// Snapshot of `chain`, `None` if the chain was never tracked
    async fn load_chain(&self, chain: Name) -> Result<Option<ChainSnapshot>, StoreError>;
    /// Atomically record a new block and the snapshot that includes it
    async fn append_block(
        &self,
        snapshot: &ChainSnapshot,
        record: &BlockRecord,
    ) -> Result<(), StoreError>;
    async fn get_block(&self, chain: Name, block_num: u32)
        -> Result<Option<BlockRecord>, StoreError>;
    /// Ids of blocks `from..=to` in block order
    async fn get_block_ids(&self, chain: Name, from: u32, to: u32)
        -> Result<Vec<Digest>, StoreError>;
    async fn list_chains(&self) -> Result<Vec<Name>, StoreError>;
}

fn chain_key(chain: Name) -> String {
    format!("chain/{chain}")
}

/// SQLite busy timeout in milliseconds
const SQLITE_BUSY_TIMEOUT: &str = "5000";

/// SQLite-backed tracker store.
/// - WAL mode for concurrent readers during writes
/// - Single writer (max_connections = 1)
/// - Key-value `store` table for chain snapshots, `blocks` table for ingested blocks
#[derive(Debug)]
pub struct SQLiteStore {
    pool: Pool<Sqlite>,
}

impl SQLiteStore {
    /// Open (or create) a store file for a single writer
    pub async fn single_writer<P: AsRef<Path>>(path: P) -> Result<Self, sqlx::Error> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("busy_timeout", SQLITE_BUSY_TIMEOUT);

        // Writer pool: single connection ensures single-writer semantics
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// Volatile store, mostly useful for tests
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        // A single connection keeps every query on the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// Acquire a connection from the pool.
    /// NOTE: if there's no available connection this function will fail after acquire timeout.
    pub async fn acquire_connection(&self) -> Result<PoolConnection<Sqlite>, sqlx::Error> {
        self.pool.acquire().await
    }

    /// Create the tables if missing
    async fn init(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.acquire_connection().await?;
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );"#,
        )
        .execute(conn.deref_mut())
        .await?;
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS blocks (
                chain TEXT NOT NULL,
                block_num INTEGER NOT NULL,
                id TEXT NOT NULL,
                root TEXT NOT NULL,
                header BLOB NOT NULL,
                PRIMARY KEY (chain, block_num)
            );"#,
        )
        .execute(conn.deref_mut())
        .await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.acquire_connection().await?;
        let row = sqlx::query("SELECT value FROM store WHERE key = ?")
            .bind(key)
            .fetch_optional(conn.deref_mut())
            .await?;
        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.acquire_connection().await?;
        set(conn.deref_mut(), key, value).await
    }
}

async fn set(executor: &mut SqliteConnection, key: &str, value: &str) -> Result<(), StoreError> {
    sqlx::query("INSERT OR REPLACE INTO store (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value)
        .execute(&mut *executor)
        .await?;
    Ok(())
}

async fn insert_block(
    executor: &mut SqliteConnection,
    chain: Name,
    record: &BlockRecord,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT OR REPLACE INTO blocks (chain, block_num, id, root, header) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(chain.to_string())
    .bind(record.block_num)
    .bind(record.id.to_hex())
    .bind(record.root.to_hex())
    .bind(record.header.encode())
    .execute(&mut *executor)
    .await?;
    Ok(())
}

#[async_trait]
impl TrackerStore for SQLiteStore {
    async fn load_chain(&self, chain: Name) -> Result<Option<ChainSnapshot>, StoreError> {
        let Some(value) = self.get(&chain_key(chain)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&value)
            .map(Some)
            .map_err(StoreError::custom)
    }

    async fn append_block(
        &self,
        snapshot: &ChainSnapshot,
        record: &BlockRecord,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_string(snapshot).map_err(StoreError::custom)?;
        let mut conn = self.acquire_connection().await?;
        let mut tx = conn.begin().await?;
        insert_block(tx.deref_mut(), snapshot.chain, record).await?;
        set(tx.deref_mut(), &chain_key(snapshot.chain), &value).await?;
        tx.commit().await.map_err(StoreError::SQLite)
    }

    async fn get_block(
        &self,
        chain: Name,
        block_num: u32,
    ) -> Result<Option<BlockRecord>, StoreError> {
        let mut conn = self.acquire_connection().await?;
        let row = sqlx::query("SELECT id, root, header FROM blocks WHERE chain = ? AND block_num = ?")
            .bind(chain.to_string())
            .bind(block_num)
            .fetch_optional(conn.deref_mut())
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.try_get("id")?;
        let root: String = row.try_get("root")?;
        let header: Vec<u8> = row.try_get("header")?;
        Ok(Some(BlockRecord {
            block_num,
            id: Digest::from_hex(&id).map_err(StoreError::custom)?,
            root: Digest::from_hex(&root).map_err(StoreError::custom)?,
            header: BlockHeader::decode(&header).map_err(StoreError::custom)?,
        }))
    }

    async fn get_block_ids(
        &self,
        chain: Name,
        from: u32,
        to: u32,
    ) -> Result<Vec<Digest>, StoreError> {
        let mut conn = self.acquire_connection().await?;
        let rows = sqlx::query(
            "SELECT id FROM blocks WHERE chain = ? AND block_num >= ? AND block_num <= ? ORDER BY block_num",
        )
        .bind(chain.to_string())
        .bind(from)
        .bind(to)
        .fetch_all(conn.deref_mut())
        .await?;
        rows.iter()
            .map(|row| {
                let id: String = row.try_get("id")?;
                Digest::from_hex(&id).map_err(StoreError::custom)
            })
            .collect()
    }

    async fn list_chains(&self) -> Result<Vec<Name>, StoreError> {
        let mut conn = self.acquire_connection().await?;
        let rows = sqlx::query("SELECT key FROM store WHERE key LIKE 'chain/%' ORDER BY key")
            .fetch_all(conn.deref_mut())
            .await?;
        rows.iter()
            .map(|row| {
                let key: String = row.try_get("key")?;
                key.trim_start_matches("chain/")
                    .parse()
                    .map_err(StoreError::custom)
            })
            .collect()
    }
}

/// In-memory tracker store
#[derive(Debug, Default)]
pub struct MemoryStore {
    chains: RwLock<HashMap<Name, ChainSnapshot>>,
    blocks: RwLock<BTreeMap<(Name, u32), BlockRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a snapshot without touching the blocks
    pub async fn put_chain(&self, snapshot: ChainSnapshot) {
        self.chains.write().await.insert(snapshot.chain, snapshot);
    }
}

#[async_trait]
impl TrackerStore for MemoryStore {
    async fn load_chain(&self, chain: Name) -> Result<Option<ChainSnapshot>, StoreError> {
        Ok(self.chains.read().await.get(&chain).cloned())
    }

    async fn append_block(
        &self,
        snapshot: &ChainSnapshot,
        record: &BlockRecord,
    ) -> Result<(), StoreError> {
        let mut chains = self.chains.write().await;
        let mut blocks = self.blocks.write().await;
        blocks.insert((snapshot.chain, record.block_num), record.clone());
        chains.insert(snapshot.chain, snapshot.clone());
        Ok(())
    }

    async fn get_block(
        &self,
        chain: Name,
        block_num: u32,
    ) -> Result<Option<BlockRecord>, StoreError> {
        Ok(self.blocks.read().await.get(&(chain, block_num)).cloned())
    }

    async fn get_block_ids(
        &self,
        chain: Name,
        from: u32,
        to: u32,
    ) -> Result<Vec<Digest>, StoreError> {
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self
            .blocks
            .read()
            .await
            .range((chain, from)..=(chain, to))
            .map(|(_, record)| record.id)
            .collect())
    }

    async fn list_chains(&self) -> Result<Vec<Name>, StoreError> {
        let mut chains: Vec<Name> = self.chains.read().await.keys().copied().collect();
        chains.sort_by_key(|chain| chain.to_string());
        Ok(chains)
    }
}

mod hex_bytes {
    use serde::{de::Error as DeError, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ibc_block::BlockTimestamp;

    fn header(num: u32) -> BlockHeader {
        let mut previous = Digest::ZERO;
        previous.0[..4].copy_from_slice(&(num - 1).to_be_bytes());
        BlockHeader {
            timestamp: BlockTimestamp(num),
            producer: "producer1".parse().unwrap(),
            confirmed: 0,
            previous,
            transaction_mroot: Digest::ZERO,
            action_mroot: Digest::ZERO,
            schedule_version: 0,
            new_producers: None,
            header_extensions: Vec::new(),
        }
    }

    fn record(num: u32) -> BlockRecord {
        let header = header(num);
        BlockRecord {
            block_num: num,
            id: header.id(),
            root: Digest::hash(num.to_le_bytes()),
            header,
        }
    }

    fn snapshot(chain: Name, head: u32) -> ChainSnapshot {
        ChainSnapshot {
            chain,
            first_block_num: 10,
            head_block_num: head,
            head_id: header(head).id(),
            frontier: vec![1, 2, 3],
        }
    }

    async fn exercise(store: &dyn TrackerStore) {
        let chain: Name = "peerchain".parse().unwrap();
        let other: Name = "otherchain".parse().unwrap();
        assert!(store.load_chain(chain).await.unwrap().is_none());

        for num in 10..15 {
            store
                .append_block(&snapshot(chain, num), &record(num))
                .await
                .unwrap();
        }
        store
            .append_block(&snapshot(other, 10), &record(10))
            .await
            .unwrap();

        assert_eq!(store.load_chain(chain).await.unwrap(), Some(snapshot(chain, 14)));
        assert_eq!(store.get_block(chain, 12).await.unwrap(), Some(record(12)));
        assert!(store.get_block(chain, 15).await.unwrap().is_none());

        let ids = store.get_block_ids(chain, 11, 13).await.unwrap();
        assert_eq!(ids, vec![record(11).id, record(12).id, record(13).id]);
        assert!(store.get_block_ids(chain, 13, 11).await.unwrap().is_empty());
        assert_eq!(store.get_block_ids(other, 10, 20).await.unwrap().len(), 1);

        assert_eq!(store.list_chains().await.unwrap(), vec![other, chain]);
    }

    #[tokio::test]
    async fn test_memory_store() {
        exercise(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_sqlite_store_in_memory() {
        exercise(&SQLiteStore::in_memory().await.unwrap()).await;
    }

    #[tokio::test]
    async fn test_sqlite_store_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("relay.db");
        let chain: Name = "peerchain".parse().unwrap();
        {
            let store = SQLiteStore::single_writer(&path).await.unwrap();
            store
                .append_block(&snapshot(chain, 10), &record(10))
                .await
                .unwrap();
        }
        let store = SQLiteStore::single_writer(&path).await.unwrap();
        assert_eq!(store.load_chain(chain).await.unwrap(), Some(snapshot(chain, 10)));
        assert_eq!(store.get_block(chain, 10).await.unwrap(), Some(record(10)));
    }

    #[tokio::test]
    async fn test_undecodable_rows_are_errors() {
        let store = SQLiteStore::in_memory().await.unwrap();
        let chain: Name = "peerchain".parse().unwrap();
        store
            .append_block(&snapshot(chain, 10), &record(10))
            .await
            .unwrap();

        let mut conn = store.acquire_connection().await.unwrap();
        sqlx::query("UPDATE blocks SET id = ? WHERE block_num = 10")
            .bind(b"\xff\xfe".to_vec())
            .execute(conn.deref_mut())
            .await
            .unwrap();
        sqlx::query("INSERT INTO store (key, value) VALUES (?, ?)")
            .bind(b"chain/\xff".to_vec())
            .bind("{}")
            .execute(conn.deref_mut())
            .await
            .unwrap();
        drop(conn);

        // Neither value decodes as text
        assert!(matches!(
            store.get_block_ids(chain, 10, 10).await,
            Err(StoreError::SQLite(_))
        ));
        assert!(store.list_chains().await.is_err());
    }

    #[tokio::test]
    async fn test_unreadable_snapshot() {
        let store = SQLiteStore::in_memory().await.unwrap();
        let chain: Name = "peerchain".parse().unwrap();
        store.set(&chain_key(chain), "not json").await.unwrap();
        assert!(matches!(
            store.load_chain(chain).await,
            Err(StoreError::Custom(_))
        ));
    }
}
