//! ria-harvest main entry point
//!
//! This is the command-line interface for the listing collector.

use anyhow::Context;
use clap::Parser;
use ria_harvest::config::{load_config_with_hash, Config};
use ria_harvest::crawler::Coordinator;
use ria_harvest::output::{export_json, load_statistics, print_statistics};
use ria_harvest::storage::{open_shared, open_storage, RunStatus};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Exit code for a run that was stopped by a signal and drained in time
const EXIT_INTERRUPTED: u8 = 130;

/// ria-harvest: a bounded-concurrency listing collector
///
/// Walks paginated search results from the configured seed URL, collects
/// every ad it has not stored before and upserts the records into SQLite.
#[derive(Parser, Debug)]
#[command(name = "ria-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A bounded-concurrency listing collector", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be collected without collecting
    #[arg(long, conflicts_with_all = ["stats", "export_json"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_json"])]
    stats: bool,

    /// Write every stored ad to PATH as JSON and exit
    #[arg(long, value_name = "PATH", conflicts_with_all = ["dry_run", "stats"])]
    export_json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(ExitCode::SUCCESS)
    } else if cli.stats {
        handle_stats(&config)?;
        Ok(ExitCode::SUCCESS)
    } else if let Some(path) = cli.export_json {
        handle_export_json(&config, &path)?;
        Ok(ExitCode::SUCCESS)
    } else {
        handle_collect(config, config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ria_harvest=info,warn"),
            1 => EnvFilter::new("ria_harvest=debug,info"),
            2 => EnvFilter::new("ria_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    let collector = &config.collector;
    let http = &config.http;

    println!("=== ria-harvest Dry Run ===\n");

    println!("Collector:");
    println!("  Seed URL: {}", collector.seed_url);
    println!("  Max concurrent requests: {}", collector.max_concurrent_requests);
    println!("  Batch size: {}", collector.batch_size);
    println!("  Batch delay: {}ms", collector.batch_delay_ms);
    println!("  Page delay: {}ms", collector.page_delay_ms);
    match collector.autosave_interval() {
        Some(period) => println!("  Autosave every: {}s", period.as_secs()),
        None => println!("  Autosave: disabled"),
    }
    println!("  Shutdown grace: {}s", collector.shutdown_grace_secs);

    println!("\nHTTP:");
    println!("  User agent: {}", http.user_agent);
    println!("  Accept-Language: {}", http.accept_language);
    println!("  Cookie: {}", if http.cookie.is_some() { "set" } else { "none" });
    println!(
        "  Timeouts: {}s request, {}s connect",
        http.timeout_secs, http.connect_timeout_secs
    );
    println!("  Phone endpoint: {}", http.phone_endpoint);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("failed to open ad database")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-json mode
fn handle_export_json(config: &Config, path: &Path) -> anyhow::Result<()> {
    let storage = open_storage(Path::new(&config.output.database_path))
        .context("failed to open ad database")?;
    let count = export_json(&storage, path)
        .with_context(|| format!("failed to export to {}", path.display()))?;

    println!("✓ Exported {} ads to: {}", count, path.display());
    Ok(())
}

/// Handles the main collection run
///
/// The run executes on its own task so a shutdown signal can cancel it and
/// then wait at most the configured grace period for the final flush.
async fn handle_collect(config: Config, config_hash: String) -> anyhow::Result<ExitCode> {
    let grace = config.collector.shutdown_grace();
    let store = open_shared(Path::new(&config.output.database_path))
        .context("failed to open ad database")?;
    let coordinator = Coordinator::new(config, config_hash, store)?;

    let cancel = CancellationToken::new();
    let mut run = tokio::spawn({
        let cancel = cancel.clone();
        async move { coordinator.run(cancel).await }
    });

    let joined = tokio::select! {
        joined = &mut run => joined,
        _ = shutdown_signal() => {
            tracing::warn!("Shutdown requested, draining for up to {:?}", grace);
            cancel.cancel();
            match tokio::time::timeout(grace, &mut run).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::error!("Grace period expired before the final flush finished");
                    std::process::exit(1);
                }
            }
        }
    };

    let summary = joined.context("collection task panicked")??;
    if summary.unflushed > 0 {
        tracing::error!("{} collected ads were not persisted", summary.unflushed);
    }

    Ok(match summary.status {
        RunStatus::Completed => ExitCode::SUCCESS,
        RunStatus::Interrupted => ExitCode::from(EXIT_INTERRUPTED),
        RunStatus::Running | RunStatus::Failed => ExitCode::FAILURE,
    })
}

/// Resolves on Ctrl+C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
