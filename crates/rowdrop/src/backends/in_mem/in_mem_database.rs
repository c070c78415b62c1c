use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;

use crate::backends::{BoxedCursor, Database, ResultCursor};
use crate::common::Row;
use crate::error::{ExportError, ExportResult};

/// 📋 A canned result set: headers, rows, and an optional booby trap.
///
/// `fail_scan_at_row` is 1-based. Row N is never handed out; the cursor returns a
/// scan error instead, the way a real driver does when a value refuses to become text.
/// `fail_close` makes every cursor over this table fail its `close`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub fail_scan_at_row: Option<u64>,
    pub fail_close: bool,
}

impl InMemoryTable {
    pub fn new(columns: &[&str], rows: Vec<Row>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            fail_scan_at_row: None,
            fail_close: false,
        }
    }

    /// 💣 Arm the trap: scanning row `row_number` (1-based) fails.
    pub fn failing_at_row(mut self, row_number: u64) -> Self {
        self.fail_scan_at_row = Some(row_number);
        self
    }

    /// 🚪 The door sticks: `close` on a cursor over this table returns an error.
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

/// 🗄️ A database that is really a `HashMap<query, table>` wearing a fake mustache.
///
/// Queries are matched by exact text. Unknown query → `ExportError::Query`.
/// An `unreachable()` database fails every `execute` with `ExportError::Connection`.
///
/// Cursor bookkeeping lives in shared counters so a test can hand the database to
/// an exporter and still check afterwards that every cursor got closed.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    tables: HashMap<String, InMemoryTable>,
    unreachable: bool,
    opened_cursors: Arc<AtomicUsize>,
    closed_cursors: Arc<AtomicUsize>,
}

impl InMemoryDatabase {
    /// 🚀 An empty database. Every query is an unknown query. Raw-content jobs don't mind.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, query: impl Into<String>, table: InMemoryTable) -> Self {
        self.tables.insert(query.into(), table);
        self
    }

    /// 🔌 Pull the network cable. Every `execute` now fails as a connection error.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn opened_cursors(&self) -> usize {
        self.opened_cursors.load(Ordering::SeqCst)
    }

    pub fn closed_cursors(&self) -> usize {
        self.closed_cursors.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    async fn execute(&self, query: &str) -> ExportResult<BoxedCursor> {
        if self.unreachable {
            return Err(ExportError::connection(
                "the in-memory database was told to be unreachable",
                "connection refused (simulated)",
            ));
        }
        let Some(table) = self.tables.get(query) else {
            return Err(ExportError::query(
                format!("no canned table for query '{query}'"),
                "no such table",
            ));
        };
        self.opened_cursors.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryCursor {
            columns: table.columns.clone(),
            rows: table.rows.clone().into_iter(),
            rows_handed_out: 0,
            fail_scan_at_row: table.fail_scan_at_row,
            fail_close: table.fail_close,
            closed: false,
            closed_cursors: Arc::clone(&self.closed_cursors),
        }))
    }
}

/// 🧵 Walks a cloned row list exactly once. Counts itself closed exactly once.
#[derive(Debug)]
pub struct InMemoryCursor {
    columns: Vec<String>,
    rows: std::vec::IntoIter<Row>,
    rows_handed_out: u64,
    fail_scan_at_row: Option<u64>,
    fail_close: bool,
    closed: bool,
    closed_cursors: Arc<AtomicUsize>,
}

#[async_trait]
impl ResultCursor for InMemoryCursor {
    async fn column_names(&mut self) -> Result<Vec<String>> {
        Ok(self.columns.clone())
    }

    async fn next_row(&mut self) -> Result<Option<Row>> {
        if self.closed {
            bail!("💀 next_row on a closed cursor. it's dead, Jim.");
        }
        let Some(row) = self.rows.next() else {
            return Ok(None);
        };
        self.rows_handed_out += 1;
        if self.fail_scan_at_row == Some(self.rows_handed_out) {
            bail!(
                "💀 scan failed on row {}: converting column value to text was not possible",
                self.rows_handed_out
            );
        }
        Ok(Some(row))
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.closed_cursors.fetch_add(1, Ordering::SeqCst);
        }
        if self.fail_close {
            bail!("💀 close failed: the server dropped the statement handle mid-goodbye");
        }
        Ok(())
    }
}
