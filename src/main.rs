//! Wheel-Harvest main entry point
//!
//! This is the command-line interface for the Wheel-Harvest fitment harvester.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use wheel_harvest::config::{load_config_with_hash, validate, validate_workers, HarvestConfig};
use wheel_harvest::output::{load_coverage, print_coverage, print_summary};
use wheel_harvest::renderer::HttpSessionFactory;
use wheel_harvest::{Orchestrator, ShutdownSignal};

/// Exit code reported when a run is cut short by Ctrl-C
const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Wheel-Harvest: a resumable wheel and tire fitment harvester
///
/// Wheel-Harvest walks every configured (make, year) pair on the vehicle
/// catalog, discovers the models listed for it and stores each model's
/// trim-level fitment data as JSON. Finished pairs are skipped on later runs.
#[derive(Parser, Debug)]
#[command(name = "wheel-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable wheel and tire fitment harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults if omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Number of concurrent workers (overrides the config file)
    #[arg(short, long, value_name = "N")]
    workers: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show pending work without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show coverage of the results directory and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    if let Some(workers) = cli.workers {
        validate_workers(workers)?;
        config.harvest.workers = workers;
    }

    // Handle different modes
    if cli.stats {
        handle_stats(&config)?;
        Ok(ExitCode::SUCCESS)
    } else if cli.dry_run {
        handle_dry_run(config)?;
        Ok(ExitCode::SUCCESS)
    } else {
        handle_harvest(config).await
    }
}

/// Loads the configuration file, or validated defaults when none is given
fn load(path: Option<&Path>) -> Result<HarvestConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        None => {
            tracing::info!("No configuration file given, using built-in defaults");
            let config = HarvestConfig::default();
            validate(&config)?;
            Ok(config)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wheel_harvest=info,warn"),
            1 => EnvFilter::new("wheel_harvest=debug,info"),
            2 => EnvFilter::new("wheel_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows configuration and pending work
fn handle_dry_run(config: HarvestConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Wheel-Harvest Dry Run ===\n");

    println!("Catalog:");
    println!("  Base URL: {}", config.catalog.base_url);
    println!(
        "  Timeouts: navigation {}ms, selector {}ms",
        config.catalog.navigation_timeout_ms, config.catalog.selector_timeout_ms
    );

    println!("\nTargets:");
    println!("  Makes ({}): {}", config.targets.makes.len(), config.targets.makes.join(", "));
    println!(
        "  Years: {} down to {}",
        config.targets.last_year, config.targets.first_year
    );

    println!("\nHarvest:");
    println!("  Workers: {}", config.harvest.workers);
    println!(
        "  Retries: {} attempts, {}ms initial backoff",
        config.retry.max_attempts, config.retry.initial_backoff_ms
    );
    println!("  USA market only: {}", config.extraction.usa_market_only);
    println!("  Results: {}", config.output.results_dir);

    let factory = HttpSessionFactory::new(&config.catalog);
    let orchestrator = Orchestrator::new(config, factory)?;
    let total = orchestrator.total_tasks();
    let pending = orchestrator.pending_tasks().len();

    println!("\n✓ Configuration is valid");
    println!(
        "✓ {} of {} tasks pending ({} already complete)",
        pending,
        total,
        total - pending
    );

    Ok(())
}

/// Handles the --stats mode: shows what the results directory holds
fn handle_stats(config: &HarvestConfig) -> Result<(), Box<dyn std::error::Error>> {
    let results_dir = Path::new(&config.output.results_dir);
    let coverage = load_coverage(results_dir)?;
    print_coverage(results_dir, &coverage);
    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: HarvestConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing::info!(
        "Makes: {}, years {}-{}, workers: {}",
        config.targets.makes.len(),
        config.targets.first_year,
        config.targets.last_year,
        config.harvest.workers
    );

    let factory = HttpSessionFactory::new(&config.catalog);
    let orchestrator = Orchestrator::new(config, factory)?;

    let (trigger, shutdown) = ShutdownSignal::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight targets");
            trigger.trigger();
        }
    });

    let summary = match orchestrator.run(shutdown).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    };

    print_summary(&summary);

    if summary.interrupted {
        Ok(ExitCode::from(INTERRUPTED_EXIT_CODE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
