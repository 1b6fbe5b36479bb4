//! hostgraph main entry point
//!
//! This is the command-line interface for the hostgraph crawler: run an
//! engine, submit crawl requests, and query their status and results.

use anyhow::Context;
use clap::{Parser, Subcommand};
use hostgraph::config::{apply_overrides, load_config_with_hash, Config};
use hostgraph::crawler::engine_from_config;
use hostgraph::output::{load_graph_statistics, print_status};
use hostgraph::requests::{crawl_results, crawl_status, create_crawl_request};
use hostgraph::storage::{open_storage, share};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// hostgraph: a depth-bounded crawler that maps which hosts a site links to
///
/// Crawl requests are queued in a SQLite database. Any number of `crawl`
/// processes pointed at the same database share the work.
#[derive(Parser, Debug)]
#[command(name = "hostgraph")]
#[command(version)]
#[command(about = "Depth-bounded crawler reporting per-host link counts", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file (overrides the config file)
    #[arg(long, global = true, value_name = "PATH")]
    database: Option<String>,

    /// Maximum concurrent workers (overrides the config file)
    #[arg(long, global = true, value_name = "N")]
    max_workers: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a crawl engine against the task queue
    Crawl {
        /// Exit once the queue is drained instead of polling for new work
        #[arg(long)]
        exit_when_idle: bool,
    },

    /// Submit a new crawl request and print its id
    Submit {
        /// Root URL (scheme defaults to http)
        url: String,

        /// Depth bound: links are followed this many levels from the root
        #[arg(short, long, default_value_t = 1)]
        levels: u32,
    },

    /// Show the progress of a crawl request
    Status {
        /// Crawl request id
        id: i64,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print host -> task count for a finished crawl request as JSON
    Results {
        /// Crawl request id
        id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(&cli)?;

    match cli.command {
        Command::Crawl { exit_when_idle } => handle_crawl(&config, exit_when_idle).await,
        Command::Submit { url, levels } => handle_submit(&config, &url, levels).await,
        Command::Status { id, json } => handle_status(&config, id, json).await,
        Command::Results { id } => handle_results(&config, id).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG`, when set, takes precedence over the flags.
fn setup_logging(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        // Only show errors
        "error"
    } else {
        match verbose {
            0 => "hostgraph=info,warn",
            1 => "hostgraph=debug,info",
            2 => "hostgraph=trace,debug",
            _ => "trace",
        }
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config file (if any) and applies command-line overrides
fn load_configuration(cli: &Cli) -> anyhow::Result<Config> {
    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    let config = apply_overrides(config, cli.database.as_deref(), cli.max_workers)
        .context("Invalid command-line override")?;
    Ok(config)
}

/// Runs an engine until Ctrl-C (or until idle with `--exit-when-idle`)
async fn handle_crawl(config: &Config, exit_when_idle: bool) -> anyhow::Result<()> {
    let storage = open_storage(config)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.path))?;
    let engine = engine_from_config(config, share(storage))?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing in-flight tasks");
            on_signal.cancel();
        }
    });

    let summary = if exit_when_idle {
        engine.run_until_idle(cancel).await?
    } else {
        engine.run(cancel).await?
    };

    if summary.crashed > 0 {
        tracing::warn!("{} workers crashed during this run", summary.crashed);
    }
    Ok(())
}

async fn handle_submit(config: &Config, url: &str, levels: u32) -> anyhow::Result<()> {
    let mut storage = open_storage(config).await?;
    let id = create_crawl_request(&mut storage, url, levels)?;
    println!("{}", id);
    Ok(())
}

async fn handle_status(config: &Config, id: i64, json: bool) -> anyhow::Result<()> {
    let storage = open_storage(config).await?;

    let status = crawl_status(&storage, id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        let graph = load_graph_statistics(&storage)?;
        print_status(id, &status, &graph);
    }
    Ok(())
}

async fn handle_results(config: &Config, id: i64) -> anyhow::Result<()> {
    let storage = open_storage(config).await?;
    let results = crawl_results(&storage, id)?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
