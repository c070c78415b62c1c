// ai
//! 📦 Common data structures — the building blocks of rowdrop
//!
//! ---
//!
//! 🎬 COLD OPEN — INT. DATA WAREHOUSE — 3:47 AM
//!
//! 🌩️ A cron job wakes up. It has one job. Literally: an [`ExportJob`].
//! It knows what to ask the database, how to chop the answer into delimited
//! text, whether to squish it, and which bucket keys should receive the
//! exact same bytes. It does not know if the bucket is in a good mood.
//! Nobody ever knows that.
//!
//! 🦆
//!
//! These are the humble structs that ferry an export request from config to
//! encoder to replicator. They are immutable once built. They do not negotiate.

use std::io::Cursor;

use bytes::Bytes;

use crate::error::{ExportError, ExportResult};

/// 🧱 One cell of a result row: present text, or absent (NULL).
///
/// Whatever the column's native type was, the database backend converted it to
/// text exactly once at the boundary. Past this point nobody cares if it was an
/// INTEGER in a past life.
pub type Cell = Option<String>;

/// 🧵 One row. Arity matches the cursor's header count. Always. Or else.
pub type Row = Vec<Cell>;

/// 🎯 What gets exported: rows from a query, or a literal string shipped as-is.
///
/// An enum instead of two optional fields, so "both" and "neither" are
/// not states a job can be in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportContent {
    /// 🗄️ Run this SQL, encode the rows.
    Query(String),
    /// 📜 Skip the database, upload this text verbatim (still optionally gzipped).
    Raw(String),
}

/// ✂️ The delimited-text dialect: what goes between fields and what goes between rows.
///
/// ⚠️ No quoting, no escaping. A separator inside a cell value ends up in the
/// output unchanged. This is the format. The format has known limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedFormat {
    pub separator: String,
    pub line_terminator: String,
}

impl DelimitedFormat {
    pub fn new(separator: impl Into<String>, line_terminator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            line_terminator: line_terminator.into(),
        }
    }
}

impl Default for DelimitedFormat {
    fn default() -> Self {
        // -- 🔧 comma + LF, the plain-toast of delimited text
        Self::new(",", "\n")
    }
}

/// 🏷️ Per-object metadata, attached identically to every key in a job.
///
/// `None` means "don't send it at all". The object store decides its own default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadMetadata {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub access_policy: Option<String>,
    pub server_side_encryption: Option<String>,
}

/// 📋 One export request. Built once per invocation, read-only afterwards.
///
/// Construct with [`ExportJob::new`] (which validates the destination keys) and
/// tweak with the `with_*` builders before handing it to the exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    name: String,
    content: ExportContent,
    format: DelimitedFormat,
    compress: bool,
    destination_keys: Vec<String>,
    metadata: UploadMetadata,
    skip_if_empty: bool,
}

impl ExportJob {
    /// 🏗️ Build a job. Fails with [`ExportError::InvalidJob`] if there are no keys
    /// or one of them is blank, because uploading to "" is a cry for help.
    pub fn new(
        name: impl Into<String>,
        content: ExportContent,
        destination_keys: Vec<String>,
    ) -> ExportResult<Self> {
        let name = name.into();
        if destination_keys.is_empty() {
            return Err(ExportError::InvalidJob(format!(
                "job '{name}' has no destination keys. the payload would have nowhere to live."
            )));
        }
        if let Some(position) = destination_keys.iter().position(|k| k.trim().is_empty()) {
            return Err(ExportError::InvalidJob(format!(
                "job '{name}' has a blank destination key at position {position}"
            )));
        }
        Ok(Self {
            name,
            content,
            format: DelimitedFormat::default(),
            compress: false,
            destination_keys,
            metadata: UploadMetadata::default(),
            skip_if_empty: false,
        })
    }

    pub fn with_format(mut self, format: DelimitedFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_metadata(mut self, metadata: UploadMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_skip_if_empty(mut self, skip_if_empty: bool) -> Self {
        self.skip_if_empty = skip_if_empty;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &ExportContent {
        &self.content
    }

    pub fn format(&self) -> &DelimitedFormat {
        &self.format
    }

    pub fn compress(&self) -> bool {
        self.compress
    }

    pub fn destination_keys(&self) -> &[String] {
        &self.destination_keys
    }

    pub fn metadata(&self) -> &UploadMetadata {
        &self.metadata
    }

    pub fn skip_if_empty(&self) -> bool {
        self.skip_if_empty
    }
}

/// 📦 The finished payload: one immutable buffer plus how many rows went into it.
///
/// `Bytes` is ref-counted, so every destination key gets its own read view of
/// the same allocation. N keys, one buffer, zero drama.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    bytes: Bytes,
    row_count: u64,
    compressed: bool,
}

impl EncodedPayload {
    pub(crate) fn new(bytes: Bytes, row_count: u64, compressed: bool) -> Self {
        Self {
            bytes,
            row_count,
            compressed,
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 📖 A fresh, independent reader positioned at byte zero.
    ///
    /// Draining one reader does nothing to the next one. Each call clones the
    /// `Bytes` handle (a refcount bump), never the data.
    pub fn reader(&self) -> Cursor<Bytes> {
        Cursor::new(self.bytes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn the_one_where_a_job_without_keys_is_turned_away_at_the_door() {
        let the_verdict = ExportJob::new("lonely", ExportContent::Raw("hi".into()), vec![]);
        assert!(matches!(the_verdict, Err(ExportError::InvalidJob(_))));
    }

    #[test]
    fn the_one_where_a_blank_key_is_also_not_a_key() {
        let the_verdict = ExportJob::new(
            "sneaky",
            ExportContent::Raw("hi".into()),
            vec!["a.csv".into(), "   ".into()],
        );
        match the_verdict {
            Err(ExportError::InvalidJob(message)) => assert!(message.contains("position 1")),
            other => panic!("💀 expected InvalidJob, got {other:?}"),
        }
    }

    #[test]
    fn the_one_where_builders_set_exactly_what_they_say() -> ExportResult<()> {
        let the_job = ExportJob::new(
            "users",
            ExportContent::Query("SELECT 1".into()),
            vec!["a".into(), "b".into()],
        )?
        .with_format(DelimitedFormat::new("\t", "\r\n"))
        .with_compression(true)
        .with_skip_if_empty(true);

        assert_eq!(the_job.name(), "users");
        assert_eq!(the_job.format().separator, "\t");
        assert_eq!(the_job.format().line_terminator, "\r\n");
        assert!(the_job.compress());
        assert!(the_job.skip_if_empty());
        assert_eq!(the_job.destination_keys(), ["a".to_string(), "b".to_string()]);
        Ok(())
    }

    #[test]
    fn the_one_where_draining_one_reader_leaves_the_next_one_full() {
        let the_payload = EncodedPayload::new(Bytes::from_static(b"id,name\n"), 0, false);

        let mut the_first = the_payload.reader();
        let mut drained = Vec::new();
        the_first
            .read_to_end(&mut drained)
            .expect("💀 reading from memory failed. physics is broken.");
        assert_eq!(drained, b"id,name\n");

        let mut the_second = the_payload.reader();
        let mut also_drained = Vec::new();
        the_second
            .read_to_end(&mut also_drained)
            .expect("💀 reading from memory failed twice. physics is very broken.");
        assert_eq!(also_drained, drained);
    }
}
