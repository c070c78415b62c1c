// ai
//! 📦 rowdrop — run a query, write it as delimited text, drop it in N places.
//!
//! 🧠 Knowledge graph:
//! - `backends`: databases (SQLite, MySQL, RAM) that hand out cursors, stores that take bytes under a key
//! - `encoder`: cursor → header + rows → plain or gzip bytes, built exactly once
//! - `replicator`: those bytes → every destination key, in order, first failure stops it
//! - `exporter`: the two of them glued together per job
//! - `app_config`: TOML + `ROWDROP_*` env → backends + jobs

pub mod app_config;
pub mod backends;
pub mod common;
pub mod encoder;
pub mod error;
pub mod exporter;
pub mod replicator;

use anyhow::{Context, Result};
use tracing::warn;

use crate::app_config::AppConfig;
use crate::backends::{DatabaseBackend, StoreBackend};
use crate::exporter::{ExportReport, Exporter};

/// 🚀 Build the backends from config and run every configured job in order.
pub async fn run(app_config: AppConfig) -> Result<Vec<ExportReport>> {
    let the_jobs = app_config
        .export_jobs()
        .context("💀 the job list did not survive validation")?;
    if the_jobs.is_empty() {
        warn!("🕳️ no jobs configured. nothing to export. enjoy the quiet.");
        return Ok(Vec::new());
    }

    let the_database = DatabaseBackend::from_config(&app_config.source_config)
        .context("💀 could not set up the database")?;
    let the_store = StoreBackend::from_config(&app_config.store_config)
        .await
        .context("💀 could not set up the object store")?;

    let mut the_exporter = Exporter::new(the_database, the_store);
    let the_reports = the_exporter
        .export_all(&the_jobs)
        .await
        .context("💀 export run aborted")?;
    Ok(the_reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::{JobConfig, SourceConfig, StoreConfig};
    use crate::backends::{FileStoreConfig, SqliteDatabaseConfig};

    fn job(name: &str, raw_content: Option<&str>, query: Option<&str>, keys: &[&str]) -> JobConfig {
        JobConfig {
            name: name.to_string(),
            query: query.map(String::from),
            query_file: None,
            query_args: Vec::new(),
            raw_content: raw_content.map(String::from),
            separator: ",".to_string(),
            line_terminator: "\n".to_string(),
            compress: false,
            keys: keys.iter().map(|k| k.to_string()).collect(),
            content_type: "text/csv".to_string(),
            content_encoding: None,
            access_policy: "private".to_string(),
            server_side_encryption: "AES256".to_string(),
            skip_if_empty: true,
        }
    }

    #[tokio::test]
    async fn the_one_where_run_goes_from_config_to_files_on_disk() -> Result<()> {
        let the_tempdir = tempfile::tempdir()?;
        let the_db_path = the_tempdir.path().join("warehouse.db");
        let the_setup = rusqlite::Connection::open(&the_db_path)?;
        the_setup.execute_batch(
            "CREATE TABLE users (id INTEGER, name TEXT);
             INSERT INTO users VALUES (1, 'Ann');
             CREATE TABLE ghosts (id INTEGER);",
        )?;
        drop(the_setup);
        let the_root = the_tempdir.path().join("out");

        let the_config = AppConfig {
            source_config: SourceConfig::Sqlite(SqliteDatabaseConfig {
                path: the_db_path,
                row_channel_capacity: 16,
            }),
            store_config: StoreConfig::File(FileStoreConfig {
                root: the_root.clone(),
            }),
            jobs: vec![
                job("users", None, Some("SELECT id, name FROM users"), &["x/users.csv", "y/users.csv"]),
                job("ghosts", None, Some("SELECT id FROM ghosts"), &["ghosts.csv"]),
                job("readme", Some("exported by rowdrop\n"), None, &["README.txt"]),
            ],
        };

        let the_reports = run(the_config).await?;

        assert_eq!(the_reports.len(), 3);
        assert_eq!(std::fs::read_to_string(the_root.join("x/users.csv"))?, "id,name\n1,Ann\n");
        assert_eq!(std::fs::read_to_string(the_root.join("y/users.csv"))?, "id,name\n1,Ann\n");
        assert!(!the_root.join("ghosts.csv").exists(), "empty + skip_if_empty = no object");
        assert_eq!(
            std::fs::read_to_string(the_root.join("README.txt"))?,
            "exported by rowdrop\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_no_jobs_means_no_work_and_no_error() -> Result<()> {
        let the_config = AppConfig {
            source_config: SourceConfig::InMemory(()),
            store_config: StoreConfig::InMemory(()),
            jobs: Vec::new(),
        };
        assert!(run(the_config).await?.is_empty());
        Ok(())
    }
}
