use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags, types::ValueRef};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::backends::{BoxedCursor, Database, ResultCursor};
use crate::common::{Cell, Row};
use crate::error::{ExportError, ExportResult};

// -- 🗄️ SqliteDatabaseConfig — lives here, next to the backend that reads it. Ethos pattern, baby. 🎯
#[derive(Debug, Deserialize, Clone)]
pub struct SqliteDatabaseConfig {
    /// 📁 The database file. Opened read-only, so it has to exist already.
    pub path: PathBuf,
    /// 📬 How many scanned rows may wait in the channel before the producer thread naps.
    #[serde(default = "default_row_channel_capacity")]
    pub row_channel_capacity: usize,
}

// -- 📦 256 rows in flight: enough to keep the encoder fed, not enough to eat the heap.
fn default_row_channel_capacity() -> usize {
    256
}

/// 📨 Notes passed from the blocking thread to the async cursor.
#[derive(Debug)]
enum SqliteEvent {
    /// ✅ Connected, prepared, here are the headers.
    Opened(Vec<String>),
    /// 🔌 Could not even open the file.
    ConnectFailed(anyhow::Error),
    /// 🐛 Opened the file, hated the SQL.
    PrepareFailed(anyhow::Error),
    /// 🐛 Prepared fine, then failed the moment SQLite actually ran it.
    ExecuteFailed(anyhow::Error),
    /// 🧵 One scanned row.
    Row(Row),
    /// 💀 Stepping or scanning a row went sideways. Nothing follows this.
    RowFailed(anyhow::Error),
    /// 🏁 No more rows.
    Done,
}

/// 🗄️ SqliteDatabase — opens the file fresh for every query, on a blocking thread.
///
/// No pooling. One export job runs one query, and connection reuse is the
/// collaborator's problem, not the pipeline's.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    database_config: SqliteDatabaseConfig,
}

impl SqliteDatabase {
    pub fn new(database_config: SqliteDatabaseConfig) -> Self {
        Self { database_config }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn execute(&self, query: &str) -> ExportResult<BoxedCursor> {
        let (tx, rx) = async_channel::bounded(self.database_config.row_channel_capacity.max(1));
        let the_path = self.database_config.path.clone();
        let the_query = query.to_owned();

        debug!("🗄️ executing query against '{}'", the_path.display());
        let producer = tokio::task::spawn_blocking(move || stream_rows(&the_path, &the_query, &tx));

        // -- 🎯 the first note decides everything: headers, or which flavor of failure
        match rx.recv().await {
            Ok(SqliteEvent::Opened(columns)) => Ok(Box::new(SqliteCursor {
                columns,
                rx,
                producer: Some(producer),
                exhausted: false,
            })),
            Ok(SqliteEvent::ConnectFailed(e)) => Err(ExportError::connection(
                format!(
                    "opening sqlite database '{}'",
                    self.database_config.path.display()
                ),
                e,
            )),
            Ok(SqliteEvent::PrepareFailed(e)) => {
                Err(ExportError::query("preparing the sqlite statement", e))
            }
            Ok(SqliteEvent::ExecuteFailed(e)) => {
                Err(ExportError::query("running the sqlite statement", e))
            }
            Ok(other) => Err(ExportError::query(
                "sqlite producer skipped the introductions",
                anyhow!("expected headers first, got {other:?}"),
            )),
            Err(_) => Err(ExportError::query(
                "sqlite producer vanished before reporting headers",
                anyhow!("the producer thread hung up (did it panic?)"),
            )),
        }
    }
}

/// 🧵 The blocking half. Owns the connection and statement for their whole lives.
///
/// Every `send_blocking` failure means the cursor went away, so we stop quietly.
fn stream_rows(path: &Path, query: &str, tx: &Sender<SqliteEvent>) {
    let the_flags = OpenFlags::SQLITE_OPEN_READ_ONLY
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let connection = match Connection::open_with_flags(path, the_flags) {
        Ok(connection) => connection,
        Err(e) => {
            let _ = tx.send_blocking(SqliteEvent::ConnectFailed(e.into()));
            return;
        }
    };
    let mut statement = match connection.prepare(query) {
        Ok(statement) => statement,
        Err(e) => {
            let _ = tx.send_blocking(SqliteEvent::PrepareFailed(e.into()));
            return;
        }
    };
    let the_columns: Vec<String> = statement
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let the_arity = the_columns.len();

    let mut rows = match statement.query([]) {
        Ok(rows) => rows,
        Err(e) => {
            let _ = tx.send_blocking(SqliteEvent::ExecuteFailed(e.into()));
            return;
        }
    };

    // -- 🎯 the first step is where SQLite really runs the query. a failure here is
    // -- the query's fault, so it is reported before the headers go out.
    let mut the_row_number = 1u64;
    let mut the_event = match rows.next() {
        Ok(step) => step_event(step, the_row_number, the_arity),
        Err(e) => {
            let _ = tx.send_blocking(SqliteEvent::ExecuteFailed(e.into()));
            return;
        }
    };
    if tx.send_blocking(SqliteEvent::Opened(the_columns)).is_err() {
        return;
    }

    loop {
        let is_last_word = !matches!(the_event, SqliteEvent::Row(_));
        if tx.send_blocking(the_event).is_err() || is_last_word {
            return;
        }
        the_row_number += 1;
        the_event = match rows.next() {
            Ok(step) => step_event(step, the_row_number, the_arity),
            Err(e) => SqliteEvent::RowFailed(
                anyhow::Error::from(e).context(format!("stepping to row {the_row_number}")),
            ),
        };
    }
}

/// 🧵 One successful step: a scanned row, a scan failure, or the end.
fn step_event(step: Option<&rusqlite::Row<'_>>, row_number: u64, arity: usize) -> SqliteEvent {
    match step {
        Some(row) => match scan_row(row, arity) {
            Ok(cells) => SqliteEvent::Row(cells),
            Err(e) => SqliteEvent::RowFailed(e.context(format!("scanning row {row_number}"))),
        },
        None => SqliteEvent::Done,
    }
}

/// 🔄 Every column becomes optional text. This is the one and only type coercion in rowdrop.
fn scan_row(row: &rusqlite::Row<'_>, arity: usize) -> Result<Row> {
    (0..arity)
        .map(|index| {
            let the_value = row
                .get_ref(index)
                .with_context(|| format!("reading column {index}"))?;
            cell_from_value(the_value).with_context(|| format!("converting column {index}"))
        })
        .collect()
}

fn cell_from_value(value: ValueRef<'_>) -> Result<Cell> {
    let the_cell = match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(text) => Some(
            std::str::from_utf8(text)
                .context("💀 TEXT value is not valid UTF-8")?
                .to_owned(),
        ),
        ValueRef::Blob(blob) => Some(
            std::str::from_utf8(blob)
                .context("💀 BLOB value is not UTF-8 text, and delimited text has no room for raw bytes")?
                .to_owned(),
        ),
    };
    Ok(the_cell)
}

/// 🧵 The async half. Reads notes until `Done`, then reports `None` forever.
#[derive(Debug)]
pub struct SqliteCursor {
    columns: Vec<String>,
    rx: Receiver<SqliteEvent>,
    producer: Option<JoinHandle<()>>,
    exhausted: bool,
}

#[async_trait]
impl ResultCursor for SqliteCursor {
    async fn column_names(&mut self) -> Result<Vec<String>> {
        Ok(self.columns.clone())
    }

    async fn next_row(&mut self) -> Result<Option<Row>> {
        if self.exhausted {
            return Ok(None);
        }
        match self.rx.recv().await {
            Ok(SqliteEvent::Row(row)) => Ok(Some(row)),
            Ok(SqliteEvent::Done) => {
                self.exhausted = true;
                Ok(None)
            }
            Ok(SqliteEvent::RowFailed(e)) => {
                self.exhausted = true;
                Err(e)
            }
            Ok(other) => bail!("💀 sqlite producer sent {other:?} in the middle of the rows"),
            Err(_) => bail!("💀 sqlite producer hung up without saying goodbye (did it panic?)"),
        }
    }

    /// 🗑️ Close the channel, then wait for the producer thread to notice and leave.
    async fn close(&mut self) -> Result<()> {
        self.rx.close();
        if let Some(producer) = self.producer.take() {
            producer
                .await
                .context("💀 the sqlite producer thread did not exit cleanly")?;
            trace!("🎬 sqlite producer joined. the connection is closed. the file is at peace.");
        }
        Ok(())
    }
}
