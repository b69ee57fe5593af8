//! Autoria-Scraper main entry point
//!
//! This is the command-line interface for the Autoria-Scraper listing crawler.

use anyhow::Context;
use autoria_scraper::config::{load_config_with_hash, Config};
use autoria_scraper::crawler::{run_crawl, CrawlReport};
use autoria_scraper::{BrowserSession, NoPhoneRevealer};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Autoria-Scraper: a used-car listing crawler
///
/// Walks the paginated listing pages from a start URL, scrapes every car's
/// detail page, reveals the seller's phone through a headless browser and
/// records each sighting in SQLite.
#[derive(Parser, Debug)]
#[command(name = "autoria-scraper")]
#[command(version)]
#[command(about = "A used-car listing crawler", long_about = None)]
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

    /// Override the first listing page
    #[arg(long, env = "START_URL", value_name = "URL")]
    start_url: Option<String>,

    /// Do not launch a browser; phones are left empty
    #[arg(long)]
    no_browser: bool,

    /// Validate config and show the effective settings without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(start_url) = cli.start_url {
        tracing::info!("Start URL overridden: {}", start_url);
        config.crawler.start_url = start_url;
        autoria_scraper::config::validate(&config).context("invalid --start-url")?;
    }
    if cli.no_browser {
        config.browser.enabled = false;
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("autoria_scraper=info,warn"),
            1 => EnvFilter::new("autoria_scraper=debug,info"),
            2 => EnvFilter::new("autoria_scraper=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective settings
fn handle_dry_run(config: &Config) {
    println!("=== Autoria-Scraper Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", config.crawler.start_url);
    println!("  Base URL: {}", config.crawler.effective_base_url());
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!(
        "  Max concurrent details: {}",
        config.crawler.max_concurrent_details
    );
    println!(
        "  Attempts per fetch: {} (backoff base {}ms)",
        config.crawler.max_attempts, config.crawler.backoff_base_ms
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!(
        "  Pacing: {}-{}ms",
        config.crawler.pacing_min_ms, config.crawler.pacing_max_ms
    );
    match config.crawler.page_limit() {
        Some(limit) => println!("  Page limit: {}", limit),
        None => println!("  Page limit: none"),
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nBrowser:");
    if config.browser.enabled {
        println!(
            "  Enabled ({})",
            if config.browser.headless { "headless" } else { "headed" }
        );
        println!(
            "  Executable: {}",
            config
                .browser
                .chrome_executable
                .as_deref()
                .unwrap_or("auto-detect")
        );
        println!(
            "  Timeouts: page load {}s, overlay {}s, wait {}s, poll {}ms",
            config.browser.page_load_timeout_secs,
            config.browser.overlay_timeout_secs,
            config.browser.wait_timeout_secs,
            config.browser.poll_interval_ms
        );
    } else {
        println!("  Disabled (phones will not be revealed)");
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Conflict policy: {}", config.output.conflict_policy);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use autoria_scraper::output::{load_statistics, print_statistics};
    use autoria_scraper::storage::open_storage;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let result = if config.browser.enabled {
        let session = BrowserSession::launch(&config.browser)
            .await
            .context("could not start the phone browser")?;
        run_crawl(config, session).await
    } else {
        tracing::info!("Browser disabled, phones will not be revealed");
        run_crawl(config, NoPhoneRevealer).await
    };

    match result {
        Ok(report) => {
            log_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

fn log_report(report: &CrawlReport) {
    tracing::info!("Crawl completed successfully: {}", report);
    tracing::info!(
        "{} HTTP attempts, peak {} concurrent fetches, peak {} concurrent detail pages",
        report.fetch_attempts,
        report.peak_fetches,
        report.peak_details
    );
}
