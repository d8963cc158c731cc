//! Transactional bucket key-value layer over SQLite
//!
//! The engine treats persistence as an opaque byte-store: named buckets
//! holding JSON-encoded records, read and written inside transactions.
//! Every multi-record mutation in the engine runs inside one `WriteTx`,
//! so a crash can never apply half of a saga.

use anno_common::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use tracing::info;

/// Bucket holding one record per work item, keyed by item ID.
pub const WORK_BUCKET: &str = "work";

/// Bucket holding one block group per labeled item, keyed by item ID.
pub const LABELS_BUCKET: &str = "labels";

/// Bucket holding one record per lab (with its users), keyed by lab key.
pub const LABS_BUCKET: &str = "labs";

/// Handle to the SQLite-backed record store.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if needed) the store at the given path.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let newly_created = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        // WAL allows concurrent readers alongside the single writer
        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

        Self::init_schema(&pool).await?;

        if newly_created {
            info!("Initialized new store: {}", db_path.display());
        } else {
            info!("Opened existing store: {}", db_path.display());
        }

        Ok(Self { pool })
    }

    /// Open an in-memory store. One connection only: each SQLite
    /// `:memory:` connection is its own database.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS records (
                bucket TEXT NOT NULL,
                key    TEXT NOT NULL,
                value  BLOB NOT NULL,
                PRIMARY KEY (bucket, key)
            )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Begin a write transaction spanning all buckets.
    pub async fn begin(&self) -> Result<WriteTx> {
        let tx = self.pool.begin().await?;
        Ok(WriteTx { tx })
    }

    /// Read one record outside any write transaction.
    pub async fn get_json<T: DeserializeOwned>(&self, bucket: &str, key: &str) -> Result<Option<T>> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("SELECT value FROM records WHERE bucket = ? AND key = ?")
                .bind(bucket)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some((bytes,)) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Scan a whole bucket in key order.
    pub async fn scan_json<T: DeserializeOwned>(&self, bucket: &str) -> Result<Vec<(String, T)>> {
        let rows: Vec<(String, Vec<u8>)> =
            sqlx::query_as("SELECT key, value FROM records WHERE bucket = ? ORDER BY key")
                .bind(bucket)
                .fetch_all(&self.pool)
                .await?;
        let mut records = Vec::with_capacity(rows.len());
        for (key, bytes) in rows {
            records.push((key, serde_json::from_slice(&bytes)?));
        }
        Ok(records)
    }
}

/// One all-or-nothing write transaction. Dropped without `commit`, it
/// rolls back.
pub struct WriteTx {
    tx: Transaction<'static, Sqlite>,
}

impl WriteTx {
    pub async fn get_json<T: DeserializeOwned>(&mut self, bucket: &str, key: &str) -> Result<Option<T>> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("SELECT value FROM records WHERE bucket = ? AND key = ?")
                .bind(bucket)
                .bind(key)
                .fetch_optional(&mut *self.tx)
                .await?;
        match row {
            Some((bytes,)) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn put_json<T: Serialize>(&mut self, bucket: &str, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        sqlx::query(
            "INSERT INTO records (bucket, key, value) VALUES (?, ?, ?)
             ON CONFLICT (bucket, key) DO UPDATE SET value = excluded.value",
        )
        .bind(bucket)
        .bind(key)
        .bind(bytes)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    pub async fn delete(&mut self, bucket: &str, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM records WHERE bucket = ? AND key = ?")
            .bind(bucket)
            .bind(key)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
