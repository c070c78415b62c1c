//! 🚀 rowdrop-cli — the front door, the bouncer, the maitre d' of rowdrop.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary crate is the thin CLI wrapper that loads config,
//! sets up logging, and then lets the real code do the heavy lifting.
//! Like a manager. 🦆

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::{Cell, CellAlignment, Table, presets::UTF8_FULL};
use rowdrop::exporter::ExportReport;
use rowdrop::replicator::ReplicationOutcome;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// 🔧 Config file used when none is given on the command line, if it exists.
const DEFAULT_CONFIG_FILE: &str = "rowdrop.toml";

/// Run a SQL query, write the result as delimited text (optionally gzipped),
/// and upload the same bytes to every configured destination key.
#[derive(Parser, Debug)]
#[command(name = "rowdrop", version)]
struct Args {
    /// Path to the TOML config. Defaults to ./rowdrop.toml when present,
    /// otherwise configuration comes from ROWDROP_* environment variables only.
    config: Option<PathBuf>,

    /// Only run the job with this name. Repeat to run several.
    #[arg(long = "job", value_name = "NAME")]
    jobs: Vec<String>,
}

/// 🚀 main() — where it all begins. The "I pressed F5 and held my breath" moment.
///
/// 🔧 Steps:
/// 1. Init tracing (so we can see what goes wrong, and when)
/// 2. Parse args
/// 3. Load config (the moment of truth)
/// 4. Run the jobs (send it and pray 🙏)
/// 5. Print the summary, or the error chain (cry)
#[tokio::main]
async fn main() -> Result<()> {
    // 📡 Set up tracing — because println! debugging is a lifestyle choice
    // we're trying to move past, like flip phones and cargo shorts
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    match export(args).await {
        Ok(reports) => {
            if !reports.is_empty() {
                println!("{}", summary_table(&reports));
            }
            // ✅ Pop the champagne. 🍾
            Ok(())
        }
        Err(err) => {
            report_failure(&err);
            // 🗑️ Exit with prejudice. Process exitus maximus.
            std::process::exit(1);
        }
    }
}

async fn export(args: Args) -> Result<Vec<ExportReport>> {
    let the_config_file = resolve_config_file(args.config.as_deref())?;

    // 🔧 Load the config — this is the moment where we find out if the TOML is valid
    // or if someone put a tab where a space should be (looking at you, Kevin)
    let mut app_config = rowdrop::app_config::load_config(the_config_file.as_deref())
        .context("💀 In rowdrop-cli we couldn't load the config. Make sure you didn't forget something obvious.")?;
    app_config.select_jobs(&args.jobs)?;

    rowdrop::run(app_config).await
}

/// 🔒 An explicit path must exist. The default path is optional: missing means env-only.
fn resolve_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) => {
            let the_path_exists = path.try_exists().with_context(|| {
                format!("💀 couldn't check whether the config file '{}' exists", path.display())
            })?;
            if !the_path_exists {
                anyhow::bail!(
                    "💀 Configuration file '{}' does not exist. If it's a relative path, \
                     check the cwd, or use an absolute path to be absolutely certain.",
                    path.display()
                );
            }
            Ok(Some(path.to_path_buf()))
        }
        None => {
            let the_default = PathBuf::from(DEFAULT_CONFIG_FILE);
            // -- 💤 not there? fine. the environment will have to carry this one.
            Ok(the_default.try_exists().unwrap_or(false).then_some(the_default))
        }
    }
}

/// 💀 Peel the onion of sadness, one layer at a time, and hint at the usual suspect.
fn report_failure(err: &anyhow::Error) {
    error!("💀 error: {}", err);
    let mut the_vibes_are_giving_connection_issues = false;
    for cause in err.chain().skip(1) {
        error!("⚠️  cause: {}", cause);
        // -- 🕵️ sniff the cause like a truffle pig hunting for connection problems
        let cause_str = cause.to_string();
        if cause_str.contains("could not reach the database")
            || cause_str.contains("dispatch failure")
            || cause_str.contains("error sending request")
            || cause_str.contains("connection refused")
            || cause_str.contains("Connection refused")
            || cause_str.contains("tcp connect error")
            || cause_str.contains("dns error")
        {
            the_vibes_are_giving_connection_issues = true;
        }
    }

    if the_vibes_are_giving_connection_issues {
        error!(
            "🔧 hint: looks like something isn't reachable. Double-check the database \
             path, the bucket endpoint, and your credentials. If you're using a local \
             S3-compatible store in Docker, `docker ps` is your friend. ☕"
        );
    }
}

/// 📊 One row per job. Right-aligned numbers because we have standards.
fn summary_table(reports: &[ExportReport]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["job", "rows", "bytes", "destinations", "status"]);
    for report in reports {
        let the_status = match &report.outcome {
            ReplicationOutcome::Skipped => "skipped (empty)",
            ReplicationOutcome::Delivered { .. } if report.compressed => "delivered (gzip)",
            ReplicationOutcome::Delivered { .. } => "delivered",
        };
        table.add_row(vec![
            Cell::new(&report.job_name),
            Cell::new(report.row_count).set_alignment(CellAlignment::Right),
            Cell::new(report.payload_bytes).set_alignment(CellAlignment::Right),
            Cell::new(report.outcome.delivered_count()).set_alignment(CellAlignment::Right),
            Cell::new(the_status),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_the_args_parse_like_a_normal_cli() {
        let the_args = Args::try_parse_from(["rowdrop", "nightly.toml", "--job", "users", "--job", "orders"])
            .expect("💀 valid args should parse");
        assert_eq!(the_args.config, Some(PathBuf::from("nightly.toml")));
        assert_eq!(the_args.jobs, vec!["users".to_string(), "orders".to_string()]);
    }

    #[test]
    fn the_one_where_an_explicit_config_must_actually_exist() {
        let the_verdict = resolve_config_file(Some(Path::new("/definitely/not/here/rowdrop.toml")));
        assert!(the_verdict.is_err());
    }

    #[test]
    fn the_one_where_the_summary_has_a_row_per_job() {
        let the_reports = vec![
            ExportReport {
                job_name: "users".to_string(),
                row_count: 2,
                payload_bytes: 17,
                compressed: false,
                outcome: ReplicationOutcome::Delivered {
                    keys: vec!["a".to_string(), "b".to_string()],
                },
            },
            ExportReport {
                job_name: "ghosts".to_string(),
                row_count: 0,
                payload_bytes: 3,
                compressed: false,
                outcome: ReplicationOutcome::Skipped,
            },
        ];
        let the_rendered = summary_table(&the_reports).to_string();
        assert!(the_rendered.contains("users"));
        assert!(the_rendered.contains("skipped (empty)"));
    }
}
