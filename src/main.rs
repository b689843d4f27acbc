//! Canvass main entry point
//!
//! This is the command-line interface for the Canvass dataset mirror.

use canvass::config::{load_config_with_hash, validate, Config};
use canvass::crawler::{run, RunOptions};
use canvass::output::{load_statistics, print_statistics, print_summary};
use canvass::Layout;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Canvass: a resumable mirror for tree-shaped JSON datasets
///
/// Canvass downloads the region tree of an election results service, then
/// the per-precinct results and contest definitions referenced from its
/// lowest tier. Files already on disk are never fetched again, so an
/// interrupted run can simply be restarted.
#[derive(Parser, Debug)]
#[command(name = "canvass")]
#[command(version = "1.0.0")]
#[command(about = "A resumable mirror for tree-shaped JSON datasets", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the output directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Only harvest results and contests from an existing structural mirror
    #[arg(long, conflicts_with = "skip_leaves")]
    skip_structure: bool,

    /// Only mirror the structural tree
    #[arg(long)]
    skip_leaves: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the existing mirror and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(output) = &cli.output {
        config.output.directory = output.to_string_lossy().into_owned();
        validate(&config)?;
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        let options = RunOptions {
            skip_structure: cli.skip_structure,
            skip_leaves: cli.skip_leaves,
        };
        handle_crawl(config, options, cli.quiet).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("canvass=info,warn"),
            1 => EnvFilter::new("canvass=debug,info"),
            2 => EnvFilter::new("canvass=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) {
    let layout = Layout::from_config(config);

    println!("=== Canvass Dry Run ===\n");

    println!("Remote:");
    println!("  Base URL: {}", config.remote.base_url);
    println!("  Root: {}", config.remote.root_path);
    println!("  Regions prefix: {}", config.remote.regions_prefix);
    println!("  Results prefix: {}", config.remote.results_prefix);
    println!("  Contests prefix: {}", config.remote.contests_prefix);
    println!("  Child paths: {:?}", config.remote.child_paths);
    println!("  User agent: {}", config.remote.user_agent);
    for name in config.remote.headers.keys() {
        println!("  Extra header: {}", name);
    }

    println!("\nCrawler:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Queue capacity: {}", config.crawler.queue_capacity);
    println!("  Delay after download: {}ms", config.crawler.request_delay_ms);
    match config.crawler.request_timeout_secs {
        Some(secs) => println!("  Request timeout: {}s", secs),
        None => println!("  Request timeout: transport default"),
    }

    println!("\nOutput:");
    println!("  Root document: {}", layout.root_document().display());
    println!("  Leaf tier: {}", layout.leaf_dir().display());
    println!("  Results: {}", layout.results_dir().display());
    println!("  Contests: {}", layout.contests_dir().display());

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows what the mirror holds
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let layout = Layout::from_config(config);
    println!("Mirror: {}\n", layout.output_root().display());

    let stats = load_statistics(&layout)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    options: RunOptions,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Workers: {}, delay after download: {}ms",
        config.crawler.workers,
        config.crawler.request_delay_ms
    );

    match run(config, options).await {
        Ok(summary) => {
            if !quiet {
                print_summary(&summary);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
