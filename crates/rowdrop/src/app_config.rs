//! 🔧 App Configuration — the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." — every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! 🧠 Knowledge graph:
//! - `AppConfig` = one source, one store, many jobs
//! - `SourceConfig` / `StoreConfig` are externally tagged enums: `[store_config.S3]`
//! - `JobConfig` is the loose, TOML-shaped job. `to_export_job` turns it into a
//!   validated [`ExportJob`] or explains, in writing, why it can't.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
// 🚀 tracing::info — because println! in production is a cry for help.
use tracing::info;

use crate::backends::{FileStoreConfig, MySqlDatabaseConfig, S3StoreConfig, SqliteDatabaseConfig};
use crate::common::{DelimitedFormat, ExportContent, ExportJob, UploadMetadata};

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 🗄️ Where the rows come from.
    pub source_config: SourceConfig,
    /// 🪣 Where the bytes go.
    pub store_config: StoreConfig,
    /// 📋 What to export. Run in the order written.
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

/// 🗄️ Database backend selection. `InMemory` carries no settings.
///
/// Figment's `Env` provider lowercases every key, so each variant also answers to
/// its lowercase name: `ROWDROP_SOURCE_CONFIG__MYSQL__HOST` lands on `MySql`.
#[derive(Debug, Deserialize, Clone)]
pub enum SourceConfig {
    #[serde(alias = "in_memory", alias = "inmemory")]
    InMemory(()),
    #[serde(alias = "sqlite")]
    Sqlite(SqliteDatabaseConfig),
    #[serde(alias = "mysql")]
    MySql(MySqlDatabaseConfig),
}

/// 🪣 Store backend selection. Same lowercase aliases, same reason.
#[derive(Debug, Deserialize, Clone)]
pub enum StoreConfig {
    #[serde(alias = "in_memory", alias = "inmemory")]
    InMemory(()),
    #[serde(alias = "file")]
    File(FileStoreConfig),
    #[serde(alias = "s3")]
    S3(S3StoreConfig),
}

/// 📋 One `[[jobs]]` entry, exactly as written. Defaults fill in the boring parts.
#[derive(Debug, Deserialize, Clone)]
pub struct JobConfig {
    pub name: String,
    /// 🗄️ Inline SQL.
    #[serde(default)]
    pub query: Option<String>,
    /// 📄 SQL from a file, with `{}` placeholders filled from `query_args` in order.
    #[serde(default)]
    pub query_file: Option<PathBuf>,
    #[serde(default)]
    pub query_args: Vec<String>,
    /// 📜 Literal text, uploaded as-is. No database involved.
    #[serde(default)]
    pub raw_content: Option<String>,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_line_terminator")]
    pub line_terminator: String,
    #[serde(default)]
    pub compress: bool,
    pub keys: Vec<String>,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// 🫁 Unset means "gzip" when `compress` is on, nothing otherwise.
    #[serde(default)]
    pub content_encoding: Option<String>,
    #[serde(default = "default_access_policy")]
    pub access_policy: String,
    #[serde(default = "default_server_side_encryption")]
    pub server_side_encryption: String,
    #[serde(default)]
    pub skip_if_empty: bool,
}

fn default_separator() -> String {
    ",".to_string()
}

fn default_line_terminator() -> String {
    "\n".to_string()
}

fn default_content_type() -> String {
    "text/csv".to_string()
}

fn default_access_policy() -> String {
    "private".to_string()
}

fn default_server_side_encryption() -> String {
    "AES256".to_string()
}

/// 🧹 Empty string in TOML means "don't send this header at all".
fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl JobConfig {
    /// 🏗️ Validate and convert into the job the exporter actually runs.
    pub fn to_export_job(&self) -> anyhow::Result<ExportJob> {
        let the_content = self.resolve_content()?;

        let the_content_encoding = match &self.content_encoding {
            Some(encoding) => non_empty(encoding),
            None if self.compress => Some("gzip".to_string()),
            None => None,
        };
        let the_metadata = UploadMetadata {
            content_type: non_empty(&self.content_type),
            content_encoding: the_content_encoding,
            access_policy: non_empty(&self.access_policy),
            server_side_encryption: non_empty(&self.server_side_encryption),
        };

        let the_job = ExportJob::new(self.name.clone(), the_content, self.keys.clone())?
            .with_format(DelimitedFormat::new(
                self.separator.clone(),
                self.line_terminator.clone(),
            ))
            .with_compression(self.compress)
            .with_metadata(the_metadata)
            .with_skip_if_empty(self.skip_if_empty);
        Ok(the_job)
    }

    /// 🎯 Exactly one of `query`, `query_file`, `raw_content`. Zero is useless, two is a coin toss.
    fn resolve_content(&self) -> anyhow::Result<ExportContent> {
        if self.query_file.is_none() && !self.query_args.is_empty() {
            bail!(
                "💀 job '{}' has query_args but no query_file to put them in",
                self.name
            );
        }
        match (&self.query, &self.query_file, &self.raw_content) {
            (Some(query), None, None) => Ok(ExportContent::Query(query.clone())),
            (None, Some(query_file), None) => {
                let the_template = std::fs::read_to_string(query_file).with_context(|| {
                    format!(
                        "💀 job '{}' could not read its query file '{}'",
                        self.name,
                        query_file.display()
                    )
                })?;
                let the_query = render_query_template(&the_template, &self.query_args)
                    .with_context(|| {
                        format!(
                            "💀 job '{}' could not fill in '{}'",
                            self.name,
                            query_file.display()
                        )
                    })?;
                Ok(ExportContent::Query(the_query))
            }
            (None, None, Some(raw_content)) => Ok(ExportContent::Raw(raw_content.clone())),
            (None, None, None) => bail!(
                "💀 job '{}' has nothing to export. set one of query, query_file, raw_content.",
                self.name
            ),
            _ => bail!(
                "💀 job '{}' sets more than one of query, query_file, raw_content. pick one.",
                self.name
            ),
        }
    }
}

/// 📄 Replace each `{}` in `template` with the next argument. Counts must match exactly.
pub fn render_query_template(template: &str, args: &[String]) -> anyhow::Result<String> {
    let the_pieces: Vec<&str> = template.split("{}").collect();
    let the_placeholder_count = the_pieces.len() - 1;
    if the_placeholder_count != args.len() {
        bail!(
            "💀 query template has {} placeholder(s) but {} argument(s) were given",
            the_placeholder_count,
            args.len()
        );
    }

    let mut the_query = String::with_capacity(template.len());
    for (i, piece) in the_pieces.iter().enumerate() {
        the_query.push_str(piece);
        if let Some(arg) = args.get(i) {
            the_query.push_str(arg);
        }
    }
    Ok(the_query)
}

impl AppConfig {
    /// 🎯 Keep only the named jobs. An empty list keeps everything.
    ///
    /// A name that matches no job is an error, so a typo on the command line
    /// doesn't quietly turn into "exported nothing, exit 0".
    pub fn select_jobs(&mut self, names: &[String]) -> anyhow::Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        if let Some(unknown) = names
            .iter()
            .find(|name| !self.jobs.iter().any(|job| &job.name == *name))
        {
            bail!("💀 no job named '{unknown}' in the configuration");
        }
        self.jobs.retain(|job| names.contains(&job.name));
        Ok(())
    }

    /// 📋 Every configured job, validated, in file order.
    pub fn export_jobs(&self) -> anyhow::Result<Vec<ExportJob>> {
        self.jobs
            .iter()
            .map(|job_config| {
                job_config
                    .to_export_job()
                    .with_context(|| format!("💀 job '{}' is misconfigured", job_config.name))
            })
            .collect()
    }
}

/// 🚀 Load the config — from a file, from env vars, or from the sheer power of hoping.
///
/// 🔧 Merges environment variables (ROWDROP_*) with an optional TOML file. Nested
/// keys use a double underscore: `ROWDROP_STORE_CONFIG__S3__BUCKET=exports`.
///
/// 📐 If `config_file_name` is None, env vars only. If Some, env vars + TOML, and
/// TOML wins on conflicts.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("ROWDROP_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    // 💬 None of that "error: error" energy. Say which layers we were reading.
    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (ROWDROP_*). \
             The file exists in our hearts, but apparently not on disk, or not in this shape.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (ROWDROP_*). \
                 No file was provided, so this one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}
