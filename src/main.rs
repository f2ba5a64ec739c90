//! Notice-Sweep main entry point
//!
//! This is the command-line interface for the Notice-Sweep crawler.

use clap::Parser;
use notice_sweep::catalog::load_catalog;
use notice_sweep::config::{load_config_with_hash, Config};
use notice_sweep::crawler::{build_http_client, run_sweep};
use notice_sweep::output::{print_plan, print_summary, write_markdown_summary, PlanOutline};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Notice-Sweep: exhaustive crawler for result-capped search APIs
///
/// Notice-Sweep splits oversized queries along filter dimensions until every
/// slice fits under the API's result cap, drains each slice, and publishes
/// every distinct record once to a message broker.
#[derive(Parser, Debug)]
#[command(name = "notice-sweep")]
#[command(version = "1.0.0")]
#[command(about = "Exhaustive crawler for result-capped search APIs", long_about = None)]
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

    /// Validate config, load the catalog and show the refinement plan without crawling
    #[arg(long)]
    dry_run: bool,

    /// Also write the run summary as Markdown to this path
    #[arg(long, value_name = "PATH", conflicts_with = "dry_run")]
    summary: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let client = build_http_client(
        &config.user_agent,
        Duration::from_secs(config.api.request_timeout_secs),
    )?;

    let catalog = match load_catalog(&config.catalog, &client).await {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!("Failed to load filter catalog: {}", e);
            return Err(e.into());
        }
    };
    tracing::info!("Filter catalog holds {} country codes", catalog.len());

    if cli.dry_run {
        handle_dry_run(&config, &PlanOutline::new(&config.planner.refinement_order, &catalog));
        return Ok(());
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let summary = run_sweep(&config, client, catalog, cancel).await?;
    print_summary(&summary);

    if let Some(path) = &cli.summary {
        write_markdown_summary(&summary, path)?;
        tracing::info!("Summary written to {}", path.display());
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("notice_sweep=info,warn"),
            1 => EnvFilter::new("notice_sweep=debug,info"),
            2 => EnvFilter::new("notice_sweep=trace,debug"),
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

/// First Ctrl-C stops the sweep between queries; the buffer is still flushed
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received, finishing the current query");
                cancel.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for interrupt: {}", e),
        }
    });
}

fn handle_dry_run(config: &Config, outline: &PlanOutline) {
    println!("=== Notice-Sweep Dry Run ===\n");

    println!("API:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Threshold: {} results", config.api.threshold);
    println!("  Page ceiling: {}", config.api.page_ceiling);
    println!("  Request delay: {}ms", config.api.request_delay_ms);
    println!(
        "  Rate-limit cooldown: {}s",
        config.api.rate_limit_cooldown_secs
    );

    println!("\nRetry budgets:");
    println!("  Probe attempts: {}", config.retry.probe_attempts);
    println!("  Leaf attempts: {}", config.retry.leaf_attempts);
    println!("  Interval: {}ms", config.retry.retry_interval_ms);

    println!("\nPublisher:");
    println!("  Server: {}", config.publisher.server_url);
    println!("  Stream: {}", config.publisher.stream);
    println!("  Subject: {}", config.publisher.subject);

    println!();
    print_plan(outline);

    println!("\n✓ Configuration is valid");
}
