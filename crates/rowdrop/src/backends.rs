//! 🔌 Backends — where the real I/O happens.
//!
//! 🗄️ Database backends pour the rows, store backends catch the bytes.
//! And in between, the encoder does arithmetic with commas.
//!
//! 🎭 This module is the casting agency. Need rows from SQLite? From MySQL? Rows from a
//! hand-written table in RAM? Need the bytes to land in S3, on local disk, or in
//! a `Vec` a test can poke at? We've got a backend for that.
//!
//! 🧠 Knowledge graph:
//! - Pattern: trait → concrete impls → backend enum → `from_config` resolver
//! - `Database::execute` → [`BoxedCursor`] → encoder drains it once, then closes it
//! - `ObjectStore::put_object` ← replicator, once per destination key, fresh body each time
//! - Configs live next to the backend that reads them (`SqliteDatabaseConfig` lives in
//!   `sqlite/`, `S3StoreConfig` in `s3/`, and so on)
//!
//! 🦆 The duck is here because every file must have one. This is law. Do not question the duck.

use std::io::Cursor;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;

use crate::app_config::{SourceConfig, StoreConfig};
use crate::common::{Row, UploadMetadata};
use crate::error::ExportResult;

pub(crate) mod file;
pub(crate) mod in_mem;
pub(crate) mod mysql;
pub(crate) mod s3;
pub(crate) mod sqlite;

pub use file::{FileStore, FileStoreConfig};
pub use in_mem::{InMemoryCursor, InMemoryDatabase, InMemoryStore, InMemoryTable, StoredObject};
pub use mysql::{MySqlCursor, MySqlDatabase, MySqlDatabaseConfig, mysql_dsn};
pub use s3::{S3Store, S3StoreConfig};
pub use sqlite::{SqliteCursor, SqliteDatabase, SqliteDatabaseConfig};

// ===== Cursor + Database =====

/// 🧵 A forward-only, single-pass walk over query results.
///
/// # Contract 📜
/// - `column_names` describes the result. Calling it more than once is allowed and cheap.
/// - `next_row` returns `Ok(Some(row))` until the rows run out, then `Ok(None)` forever.
///   An `Err` means this row could not be scanned into text.
/// - `close` releases whatever the cursor holds. It MUST be called on every exit path,
///   and calling it twice is harmless.
#[async_trait]
pub trait ResultCursor: Send + std::fmt::Debug {
    async fn column_names(&mut self) -> Result<Vec<String>>;
    async fn next_row(&mut self) -> Result<Option<Row>>;
    async fn close(&mut self) -> Result<()>;
}

/// 📦 Cursors come in many shapes. The encoder only cares that they walk forward.
pub type BoxedCursor = Box<dyn ResultCursor>;

/// 🗄️ Something that can turn SQL into a cursor.
///
/// Unlike cursors and stores, `execute` returns [`ExportResult`] directly: only the
/// backend knows whether a failure was "never connected" or "connected, hated the
/// query", and that difference is the caller's business.
#[async_trait]
pub trait Database: Send + Sync + std::fmt::Debug {
    async fn execute(&self, query: &str) -> ExportResult<BoxedCursor>;
}

// ===== Object store =====

/// 📬 One upload: a key, a body to drain, and the metadata to stamp on it.
///
/// The body is a reader over a shared immutable buffer. Stores are free to drain
/// it completely; the next key gets its own.
#[derive(Debug)]
pub struct PutRequest {
    pub key: String,
    pub body: Cursor<Bytes>,
    pub metadata: UploadMetadata,
}

/// 🪣 A place where bytes go to live under a key.
///
/// # Contract 📜
/// - `put_object` writes the whole body under `request.key`, or returns `Err`.
/// - No retries here. If the store wants to retry, it does so privately.
#[async_trait]
pub trait ObjectStore: Send + std::fmt::Debug {
    async fn put_object(&mut self, request: PutRequest) -> Result<()>;
}

// ===== Backend enums =====

/// 🎭 The many faces of a Database — a polymorphic casting call for row origins.
#[derive(Debug)]
pub enum DatabaseBackend {
    InMemory(InMemoryDatabase),
    Sqlite(SqliteDatabase),
    MySql(MySqlDatabase),
}

impl DatabaseBackend {
    /// 🔧 Resolve the database backend from config. No I/O: connections open per query.
    /// MySQL can still fail here, if its settings don't make a valid DSN.
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        let the_database = match config {
            SourceConfig::InMemory(()) => Self::InMemory(InMemoryDatabase::new()),
            SourceConfig::Sqlite(sqlite_config) => {
                Self::Sqlite(SqliteDatabase::new(sqlite_config.clone()))
            }
            SourceConfig::MySql(mysql_config) => Self::MySql(
                MySqlDatabase::new(mysql_config.clone())
                    .context("💀 the mysql settings don't add up to a connection string")?,
            ),
        };
        Ok(the_database)
    }
}

#[async_trait]
impl Database for DatabaseBackend {
    async fn execute(&self, query: &str) -> ExportResult<BoxedCursor> {
        match self {
            DatabaseBackend::InMemory(db) => db.execute(query).await,
            DatabaseBackend::Sqlite(db) => db.execute(query).await,
            DatabaseBackend::MySql(db) => db.execute(query).await,
        }
    }
}

/// 🎭 The many faces of an ObjectStore. Mirrors `DatabaseBackend` on the other end of the pipe.
#[derive(Debug)]
pub enum StoreBackend {
    InMemory(InMemoryStore),
    File(FileStore),
    S3(S3Store),
}

impl StoreBackend {
    /// 🔧 Resolve the store backend from config. S3 loads credentials here, File makes its root dir.
    pub async fn from_config(config: &StoreConfig) -> Result<Self> {
        let the_store = match config {
            StoreConfig::InMemory(()) => Self::InMemory(InMemoryStore::new()),
            StoreConfig::File(file_config) => Self::File(
                FileStore::new(file_config.clone())
                    .await
                    .context("💀 the file store could not set up its root directory")?,
            ),
            StoreConfig::S3(s3_config) => Self::S3(S3Store::new(s3_config.clone()).await),
        };
        Ok(the_store)
    }
}

#[async_trait]
impl ObjectStore for StoreBackend {
    async fn put_object(&mut self, request: PutRequest) -> Result<()> {
        match self {
            StoreBackend::InMemory(store) => store.put_object(request).await,
            StoreBackend::File(store) => store.put_object(request).await,
            StoreBackend::S3(store) => store.put_object(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mysql_config(host: &str) -> MySqlDatabaseConfig {
        MySqlDatabaseConfig {
            user: "etl".into(),
            password: "hunter2".into(),
            host: host.into(),
            port: 3306,
            name: "warehouse".into(),
            row_channel_capacity: 4,
            connect_timeout_secs: 1,
        }
    }

    #[test]
    fn the_one_where_in_memory_source_config_resolves_to_in_memory_database() -> Result<()> {
        let the_backend = DatabaseBackend::from_config(&SourceConfig::InMemory(()))?;
        assert!(matches!(the_backend, DatabaseBackend::InMemory(_)));
        Ok(())
    }

    #[test]
    fn the_one_where_sqlite_config_resolves_without_touching_the_disk() -> Result<()> {
        let the_backend = DatabaseBackend::from_config(&SourceConfig::Sqlite(SqliteDatabaseConfig {
            path: "does/not/exist/yet.db".into(),
            row_channel_capacity: 4,
        }))?;
        assert!(matches!(the_backend, DatabaseBackend::Sqlite(_)));
        Ok(())
    }

    #[test]
    fn the_one_where_mysql_config_resolves_without_dialing_anyone() -> Result<()> {
        let the_backend =
            DatabaseBackend::from_config(&SourceConfig::MySql(mysql_config("db.nowhere.invalid")))?;
        assert!(matches!(the_backend, DatabaseBackend::MySql(_)));
        Ok(())
    }

    #[test]
    fn the_one_where_a_hostless_mysql_config_is_turned_away_early() {
        let the_verdict = DatabaseBackend::from_config(&SourceConfig::MySql(mysql_config("")));
        assert!(the_verdict.is_err());
    }

    #[tokio::test]
    async fn the_one_where_the_file_store_config_builds_its_root() -> Result<()> {
        let the_tempdir = tempfile::tempdir()?;
        let the_root = the_tempdir.path().join("nested").join("exports");
        let the_backend = StoreBackend::from_config(&StoreConfig::File(FileStoreConfig {
            root: the_root.clone(),
        }))
        .await?;
        assert!(matches!(the_backend, StoreBackend::File(_)));
        assert!(the_root.is_dir(), "💀 the root dir should exist after from_config");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_enum_dispatches_to_the_in_memory_store() -> Result<()> {
        let the_store = InMemoryStore::new();
        let mut the_backend = StoreBackend::InMemory(the_store.clone());
        the_backend
            .put_object(PutRequest {
                key: "k".into(),
                body: Cursor::new(Bytes::from_static(b"v")),
                metadata: UploadMetadata::default(),
            })
            .await?;
        let the_objects = the_store.objects().await;
        assert_eq!(the_objects.len(), 1);
        assert_eq!(the_objects[0].bytes, b"v");
        Ok(())
    }
}
