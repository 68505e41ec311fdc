use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use unit_sync::{run_command, setup_database, CommandFlags, Config};

/// Reconcile a JSON snapshot of units against the unit database.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to JSON file with information to update
    source: PathBuf,

    /// Only show differences (no inserts/updates)
    #[arg(short, long)]
    diff: bool,

    /// Insert new units
    #[arg(short, long)]
    insert: bool,

    /// Update existing units
    #[arg(short, long)]
    update: bool,

    /// TOML config file (defaults to $UNIT_SYNC_CONFIG, then built-in defaults)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn flags(&self) -> CommandFlags {
        CommandFlags {
            diff: self.diff,
            insert: self.insert,
            update: self.update,
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("UNIT_SYNC_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "unit_sync=debug,info"
        } else {
            "unit_sync=info,warn"
        })
    });

    let format = env::var("UNIT_SYNC_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries the JSON result, logs go to stderr
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    info!(database = %config.database.path.display(), "Opening database");

    let mut conn = Connection::open(&config.database.path).with_context(|| {
        format!("Failed to open database {}", config.database.path.display())
    })?;
    setup_database(&conn).context("Failed to set up database schema")?;

    let result = run_command(&mut conn, &cli.source, cli.flags(), &config.audit.actor);
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
