//! Grocry main entry point
//!
//! This is the command-line interface for the Grocry price service.

use anyhow::Context;
use clap::Parser;
use grocry::api::{self, AppState};
use grocry::config::{load_config_with_hash, Config};
use grocry::crawler::{build_adapters, run_all_once, CycleSettings, Scheduler};
use grocry::storage::{open_catalog, CatalogStore};
use grocry::PriceMatcher;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Grocry: grocery price crawling and matching
///
/// Grocry crawls store websites on a schedule, keeps a catalog of current
/// product prices, and serves "closest price to target" queries over HTTP.
#[derive(Parser, Debug)]
#[command(name = "grocry")]
#[command(version)]
#[command(about = "Grocery price crawler and matcher", long_about = None)]
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

    /// Run one ingestion cycle for every enabled store and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    once: bool,

    /// Validate config and show the resolved store profiles without crawling
    #[arg(long, conflicts_with_all = ["once", "stats"])]
    dry_run: bool,

    /// Show catalog statistics and exit
    #[arg(long, conflicts_with_all = ["once", "dry_run"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.once {
        handle_once(&config, config_hash).await
    } else {
        handle_serve(config, config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("grocry=info,warn"),
            1 => EnvFilter::new("grocry=debug,tower_http=debug,info"),
            2 => EnvFilter::new("grocry=trace,debug"),
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

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Grocry Dry Run ===\n");

    println!("Server:");
    println!("  Bind address: {}", config.server.bind_address);
    println!("  Allowed origins: {}", config.server.allowed_origins.join(", "));

    println!("\nCrawler:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max pages per cycle: {}", config.crawler.max_pages);
    println!("  Max concurrent pages: {}", config.crawler.max_concurrent_pages);
    println!("  Page timeout: {}s", config.crawler.page_timeout_secs);
    println!("  Cycle timeout: {}s", config.crawler.cycle_timeout_secs);

    println!("\nSchedule:");
    println!("  Interval: {}s", config.schedule.interval_secs);
    println!(
        "  Retry backoff: {}s doubling to {}s",
        config.schedule.retry_base_secs, config.schedule.retry_max_secs
    );
    println!(
        "  Degraded after: {} failures",
        config.schedule.degraded_after_failures
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nCatalog:");
    println!("  Database: {}", config.catalog.database_path);
    println!(
        "  Staleness window: {}s",
        config.catalog.staleness_window_secs
    );

    let profiles = config.enabled_profiles();
    println!("\nStores ({} enabled):", profiles.len());
    for profile in &profiles {
        println!("  - {} ({})", profile.store_id, profile.domain);
        for seed in &profile.seeds {
            println!("    seed: {}", seed);
        }
        println!("    product pages: {}", profile.product_patterns.join(", "));
        println!("    robots.txt: {}", if profile.respect_robots { "respected" } else { "ignored" });
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows catalog statistics
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let catalog = open_catalog(Path::new(&config.catalog.database_path))?;

    println!("Database: {}\n", config.catalog.database_path);
    println!("Products: {}", catalog.count_products()?);
    for (store, count) in catalog.count_by_store()? {
        println!("  {}: {}", store, count);
    }

    println!("\nLatest cycles:");
    for profile in config.enabled_profiles() {
        match catalog.latest_cycle(profile.store_id)? {
            Some(cycle) => {
                println!(
                    "  {}: {} at {} ({} upserted, {} rejected, {} failed pages)",
                    profile.store_id,
                    cycle.status.to_db_string(),
                    cycle.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    cycle.stats.upserted,
                    cycle.stats.rejected,
                    cycle.stats.failed_pages
                );
                if let Some(error) = cycle.error_message {
                    println!("    error: {}", error);
                }
            }
            None => println!("  {}: never crawled", profile.store_id),
        }
    }

    Ok(())
}

/// Handles the --once mode: one cycle per store, then exit
async fn handle_once(config: &Config, config_hash: String) -> anyhow::Result<()> {
    let catalog = open_catalog(Path::new(&config.catalog.database_path))?;
    let adapters = build_adapters(config)?;
    let settings = cycle_settings(config, config_hash);

    let outcomes = run_all_once(&adapters, &catalog, &settings).await;

    let mut succeeded = 0;
    for (adapter, outcome) in adapters.iter().zip(outcomes) {
        match outcome {
            Ok(outcome) if outcome.succeeded() => {
                succeeded += 1;
                println!(
                    "✓ {}: {} products ({} pruned)",
                    adapter.store_id(),
                    outcome.stats.upserted,
                    outcome.pruned
                );
            }
            Ok(outcome) => println!(
                "✗ {}: {}",
                adapter.store_id(),
                outcome.error.as_deref().unwrap_or("cancelled")
            ),
            Err(e) => println!("✗ {}: {}", adapter.store_id(), e),
        }
    }

    if succeeded == 0 && !adapters.is_empty() {
        anyhow::bail!("every store failed");
    }
    Ok(())
}

/// Handles the default mode: scheduler plus HTTP server
async fn handle_serve(config: Config, config_hash: String) -> anyhow::Result<()> {
    let catalog: Arc<dyn CatalogStore> =
        Arc::new(open_catalog(Path::new(&config.catalog.database_path))?);
    let adapters = build_adapters(&config)?;

    let scheduler = Scheduler::new(
        adapters,
        catalog.clone(),
        config.schedule.clone(),
        cycle_settings(&config, config_hash),
    )
    .with_compaction(
        config.catalog.compaction_interval(),
        config.catalog.staleness_window(),
    )
    .start();

    let state = AppState {
        catalog: catalog.clone(),
        matcher: PriceMatcher::new(
            catalog,
            config.matcher.clone(),
            config.catalog.staleness_window(),
        ),
        scheduler: scheduler.clone(),
    };
    let app = api::router(state, &config.server)?;

    let listener = tokio::net::TcpListener::bind(config.server.bind_address.as_str())
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind_address))?;
    tracing::info!("Starting server on {}", config.server.bind_address);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    scheduler.shutdown().await;
    served.context("Server error")?;

    tracing::info!("Server stopped gracefully");
    Ok(())
}

fn cycle_settings(config: &Config, config_hash: String) -> CycleSettings {
    CycleSettings {
        cycle_timeout: config.crawler.cycle_timeout(),
        config_hash,
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
