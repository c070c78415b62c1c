// ai
//! 🎬 *[camera pans across a dimly lit data warehouse]*
//! 🎬 "In a world where reports must exist in three buckets at once..."
//! 🎬 "One exporter dared to encode them exactly once."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Exporter — owns a database and a store, runs jobs front to back.
//!
//! 🧠 Knowledge graph:
//! - `export`: encode (query or raw) → replicate → [`ExportReport`]
//! - `export_all`: jobs in order, first failure stops the line
//! - The payload is fully built before the first upload starts. A failure while
//!   encoding means nothing was uploaded for that job. Ever.
//! - One await at a time. The async is for the I/O underneath, not for racing jobs.

use tracing::{info, warn};

use crate::backends::{Database, ObjectStore};
use crate::common::{ExportContent, ExportJob};
use crate::encoder::{encode_query, encode_text};
use crate::error::ExportResult;
use crate::replicator::{ReplicationOutcome, put_all};

/// 📊 What happened to one job, for humans and for the CLI's summary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub job_name: String,
    /// 🔢 Data rows encoded. Always 0 for raw content.
    pub row_count: u64,
    /// 📏 Size of the payload as uploaded, compressed or not.
    pub payload_bytes: usize,
    pub compressed: bool,
    pub outcome: ReplicationOutcome,
}

/// 📦 The Exporter: one database, one store, as many jobs as you can write TOML for.
#[derive(Debug)]
pub struct Exporter<D, S> {
    database: D,
    store: S,
}

impl<D, S> Exporter<D, S>
where
    D: Database,
    S: ObjectStore,
{
    pub fn new(database: D, store: S) -> Self {
        Self { database, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 🚀 Encode the job's content once, then upload it to every destination key.
    pub async fn export(&mut self, job: &ExportJob) -> ExportResult<ExportReport> {
        info!(
            "🚀 export '{}' starting, {} destination key(s)",
            job.name(),
            job.destination_keys().len()
        );

        let the_payload = match job.content() {
            ExportContent::Query(query) => {
                encode_query(&self.database, query, job.format(), job.compress()).await?
            }
            ExportContent::Raw(text) => encode_text(text, job.compress())?,
        };

        if the_payload.is_empty() {
            warn!(
                "🕳️ export '{}' produced a zero-byte payload. the objects will be empty files.",
                job.name()
            );
        }
        let the_outcome = put_all(&mut self.store, &the_payload, job).await?;

        info!(
            "✅ export '{}' finished: {} rows, {} bytes, {} object(s) written",
            job.name(),
            the_payload.row_count(),
            the_payload.len(),
            the_outcome.delivered_count()
        );
        Ok(ExportReport {
            job_name: job.name().to_string(),
            row_count: the_payload.row_count(),
            payload_bytes: the_payload.len(),
            compressed: the_payload.is_compressed(),
            outcome: the_outcome,
        })
    }

    /// 🔁 Run every job in order. The first error is returned and later jobs don't run.
    pub async fn export_all(&mut self, jobs: &[ExportJob]) -> ExportResult<Vec<ExportReport>> {
        let mut the_reports = Vec::with_capacity(jobs.len());
        for job in jobs {
            the_reports.push(self.export(job).await?);
        }
        Ok(the_reports)
    }
}
