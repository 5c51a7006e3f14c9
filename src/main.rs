//! # revscan CLI
//!
//! Commands:
//!
//! | Command | Description |
//! |---------|-------------|
//! | `revscan init` | Create the SQLite store and run schema migrations |
//! | `revscan scan` | Fetch all review pages, diff against the snapshot, render views |
//! | `revscan export` | Dump the last scan as BOM-prefixed semicolon CSV |
//! | `revscan stats` | Show the stored run summary |
//!
//! ```bash
//! revscan init --config ./config/revscan.toml
//! revscan scan
//! revscan export --output reviews.csv
//! ```

mod config;
mod db;
mod diff;
mod export;
mod fetch;
mod models;
mod parse;
mod progress;
mod scan;
mod stats;
mod store;
mod views;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::progress::ProgressMode;

/// revscan — incremental scanner and vote-change tracker for your own
/// product review history.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/revscan.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "revscan",
    about = "Incremental scanner and vote-change tracker for your own review history",
    version,
    long_about = "revscan pages through your profile's review endpoint using the server-issued \
    continuation token, parses each HTML fragment into typed records, diffs the fresh set \
    against the previous run's snapshot to find helpful-vote changes, and renders changed, \
    recently-changed, and top-ranked views. Scans are strictly sequential with a fixed \
    inter-request delay to respect upstream rate limits."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/revscan.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite file and the `reviews` and `state` tables.
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Run a full scan: paginate, parse, diff, render, persist.
    ///
    /// Fetches pages one at a time until the server stops issuing a
    /// continuation token, then shows vote changes since the last scan.
    /// Ctrl-C aborts between pages without touching the stored snapshot.
    Scan {
        /// Cap the number of pages fetched this run (overrides config;
        /// 0 = unlimited). Useful for bounded testing.
        #[arg(long)]
        max_pages: Option<u32>,

        /// Fetch, diff, and render without writing anything to the store.
        #[arg(long)]
        dry_run: bool,

        /// Progress output on stderr: `off`, `human`, or `json`.
        /// Defaults to `human` when stderr is a TTY.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Export the last scan's records as CSV.
    ///
    /// Semicolon-delimited, BOM-prefixed, every field quoted. Writes to
    /// stdout unless `--output` is given. No-op if no scan has run.
    Export {
        /// Output file path (stdout when omitted).
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show the stored run summary without scanning.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            db::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Scan {
            max_pages,
            dry_run,
            progress,
        } => {
            let mode = match progress.as_deref() {
                Some(s) => ProgressMode::parse(s)
                    .ok_or_else(|| anyhow::anyhow!("invalid --progress value: {}", s))?,
                None => ProgressMode::default_for_tty(),
            };
            scan::run_scan(&cfg, max_pages, dry_run, mode).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref()).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
