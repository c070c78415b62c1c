// ai
//! 💀 Errors — the five stages of export grief, plus one for bad paperwork.
//!
//! 🎬 *[a query walks into a database. the database does not walk back out.]*
//!
//! The core pipeline (encoder + replicator) speaks [`ExportError`]. Backends speak
//! `anyhow` like the rest of rowdrop, and the core wraps whatever they say into the
//! right variant so the caller can tell a dead database from a dead bucket without
//! string-matching tea leaves.
//!
//! 🧠 Knowledge graph:
//! - `Connection`: the database never picked up the phone. Fatal. No retry.
//! - `Query`: the database picked up, heard the SQL, and hung up.
//! - `EmptySchema`: the result had zero columns. No header, no export.
//! - `Encoding`: a row failed to scan or the sink refused a write. Partial payload is dropped.
//! - `Upload`: one key failed. Later keys never run, earlier keys stay where they landed.
//! - `InvalidJob`: the job was malformed before any I/O happened.
//!
//! 🦆 The duck has filed an `ExportError::Duck` proposal. It was rejected.

use thiserror::Error;

/// 📦 Whatever the collaborator coughed up, boxed and ready to be blamed.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 🔧 Shorthand for results coming out of the core.
pub type ExportResult<T> = Result<T, ExportError>;

/// 💀 Everything that can go wrong between `SELECT` and `PutObject`.
#[derive(Error, Debug)]
pub enum ExportError {
    /// 📡 The database could not be reached at all.
    #[error("💀 could not reach the database: {message}")]
    Connection {
        message: String,
        #[source]
        source: BoxedCause,
    },

    /// 🐛 The query was rejected, or the cursor could not describe or close itself.
    #[error("💀 query failed: {message}")]
    Query {
        message: String,
        #[source]
        source: BoxedCause,
    },

    /// 🕳️ Zero columns. There is nothing to put in a header, so nothing gets exported.
    #[error("💀 the query returned zero columns, refusing to export a payload with no header")]
    EmptySchema,

    /// 🧵 A row failed mid-stream. The partial payload has already been thrown away.
    #[error("💀 encoding failed after {rows_read} rows: {message}")]
    Encoding {
        message: String,
        rows_read: u64,
        #[source]
        source: Option<BoxedCause>,
    },

    /// 🪣 One destination key refused the payload.
    #[error("💀 upload to key '{key}' failed")]
    Upload {
        key: String,
        #[source]
        source: BoxedCause,
    },

    /// 📋 The job itself is nonsense (no keys, blank keys, and similar crimes).
    #[error("💀 invalid export job: {0}")]
    InvalidJob(String),
}

impl ExportError {
    pub(crate) fn connection(message: impl Into<String>, source: impl Into<BoxedCause>) -> Self {
        Self::Connection {
            message: message.into(),
            source: source.into(),
        }
    }

    pub(crate) fn query(message: impl Into<String>, source: impl Into<BoxedCause>) -> Self {
        Self::Query {
            message: message.into(),
            source: source.into(),
        }
    }

    pub(crate) fn encoding(
        message: impl Into<String>,
        rows_read: u64,
        source: Option<BoxedCause>,
    ) -> Self {
        Self::Encoding {
            message: message.into(),
            rows_read,
            source,
        }
    }

    pub(crate) fn upload(key: impl Into<String>, source: impl Into<BoxedCause>) -> Self {
        Self::Upload {
            key: key.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn the_one_where_the_upload_error_remembers_which_key_betrayed_us() {
        let the_error = ExportError::upload("b/users.csv", anyhow::anyhow!("503 slow down"));
        assert_eq!(the_error.to_string(), "💀 upload to key 'b/users.csv' failed");
        let the_cause = the_error
            .source()
            .expect("💀 the upload error lost its cause. a mystery with no suspect.");
        assert_eq!(the_cause.to_string(), "503 slow down");
    }

    #[test]
    fn the_one_where_an_encoding_error_can_exist_without_a_cause() {
        let the_error = ExportError::encoding("row 2 has 3 cells, expected 2", 2, None);
        assert!(the_error.source().is_none());
        assert!(the_error.to_string().contains("after 2 rows"));
    }
}
