//! Operator CLI for weather time-series stores.
//!
//! Inspects chunk files, reads series through the same readers the API uses,
//! writes single-location series from CSV and cleans up after crashed writers.

mod commands;
mod csv;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "series-admin")]
#[command(about = "Inspect, read and maintain weather time-series chunk stores")]
struct Args {
    /// Domain and variable configuration
    #[arg(short, long, default_value = "series.yaml", env = "SERIES_CONFIG")]
    config: PathBuf,

    /// Log level or filter directive
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Log as JSON lines
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the header of a chunk file, optionally with one location's series
    Inspect {
        file: PathBuf,

        /// Location to dump
        #[arg(long)]
        location: Option<usize>,

        /// Level of the dumped location
        #[arg(long, default_value_t = 0)]
        level: usize,
    },

    /// Read a series as CSV. Several --domain flags are mixed, the last one
    /// taking priority.
    Read {
        #[arg(short, long = "domain", required = true)]
        domains: Vec<String>,

        #[arg(short, long)]
        variable: String,

        #[arg(short, long)]
        location: usize,

        /// First instant (ISO-8601)
        #[arg(long)]
        start: String,

        /// End instant, exclusive (ISO-8601)
        #[arg(long)]
        end: String,

        /// Output step in seconds (default: native step of the last domain)
        #[arg(long)]
        dt: Option<i64>,

        #[arg(long, default_value_t = 0)]
        level: usize,

        /// Read the run issued this many days ago
        #[arg(long, default_value_t = 0)]
        previous_run: usize,
    },

    /// Merge a `time,value` CSV for one location into a domain
    Write {
        #[arg(short, long)]
        domain: String,

        #[arg(short, long)]
        variable: String,

        #[arg(short, long)]
        location: usize,

        #[arg(long, default_value_t = 0)]
        level: usize,

        /// Also maintain previous-run snapshots
        #[arg(long)]
        previous_runs: bool,

        csv: PathBuf,
    },

    /// Remove temp files left behind by interrupted writers
    PurgeTemp {
        root: PathBuf,

        /// Only list what would be removed
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_tracing(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if args.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    match args.command {
        Command::Inspect {
            file,
            location,
            level,
        } => commands::inspect(&file, location, level),
        Command::Read {
            domains,
            variable,
            location,
            start,
            end,
            dt,
            level,
            previous_run,
        } => {
            let query = commands::ReadQuery {
                domains,
                variable,
                location,
                start,
                end,
                dt,
                level,
                previous_run,
            };
            commands::read(&args.config, query).await
        }
        Command::Write {
            domain,
            variable,
            location,
            level,
            previous_runs,
            csv,
        } => commands::write(
            &args.config,
            &domain,
            &variable,
            location,
            level,
            previous_runs,
            &csv,
        ),
        Command::PurgeTemp { root, dry_run } => commands::purge_temp(&root, dry_run),
    }
}
