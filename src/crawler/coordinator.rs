//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that walks the listing pages one
//! at a time:
//! - Fetching the listing page through the shared fetcher
//! - Handing its detail links to the worker pool
//! - Persisting the resulting batch in one transaction
//! - Following the pager until it runs out, loops, or hits the page limit

use crate::browser::{PhoneGate, PhoneRevealer};
use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::pagination::parse_listing;
use crate::crawler::worker::{DetailPool, Pacing};
use crate::state::CrawlState;
use crate::storage::{ListingStore, SqliteStorage};
use crate::ScraperError;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Totals of one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Listing pages fetched and processed
    pub pages: u32,
    /// Observations committed
    pub items_saved: usize,
    /// Detail pages dropped after an item-level failure
    pub items_failed: usize,
    /// Observations skipped as duplicates under the skip-item policy
    pub items_skipped: usize,
    pub batches_saved: usize,
    /// Pages whose batch could not be persisted
    pub batches_failed: usize,
    /// HTTP attempts issued, retries included
    pub fetch_attempts: u64,
    pub peak_fetches: usize,
    pub peak_details: usize,
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages, {} items saved, {} failed, {} skipped, {} batches saved, {} batches failed",
            self.pages,
            self.items_saved,
            self.items_failed,
            self.items_skipped,
            self.batches_saved,
            self.batches_failed
        )
    }
}

/// Main crawler coordinator structure
pub struct Coordinator<R> {
    config: Arc<Config>,
    storage: SqliteStorage,
    fetcher: Arc<Fetcher>,
    pool: DetailPool<R>,
    base_url: Url,
}

impl<R: PhoneRevealer> Coordinator<R> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `revealer` - Phone revealer; the coordinator takes sole ownership
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(ScraperError)` - Failed to open storage, build the client or
    ///   parse the base URL
    pub fn new(config: Config, revealer: R) -> Result<Self, ScraperError> {
        Self::with_gate(config, PhoneGate::new(revealer))
    }

    /// Creates a coordinator around an existing phone gate
    ///
    /// The caller keeps a clone of the gate, so it can still shut the
    /// revealer down if construction fails.
    pub fn with_gate(config: Config, gate: PhoneGate<R>) -> Result<Self, ScraperError> {
        let base_url = Url::parse(config.crawler.effective_base_url())?;

        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

        let fetcher = Arc::new(Fetcher::from_config(&config.crawler, &config.user_agent)?);

        let pacing = Pacing::new(
            Duration::from_millis(config.crawler.pacing_min_ms),
            Duration::from_millis(config.crawler.pacing_max_ms),
        );
        let pool = DetailPool::new(
            Arc::clone(&fetcher),
            gate,
            config.crawler.max_concurrent_details as usize,
        )
        .with_pacing(pacing);

        Ok(Self {
            config: Arc::new(config),
            storage,
            fetcher,
            pool,
            base_url,
        })
    }

    /// Read access to the listing store
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Runs the listing walk until the pager is exhausted
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The walk finished
    /// * `Err(ScraperError)` - A listing page could not be fetched or the
    ///   browser failed; batches committed so far stay committed
    pub async fn run(&mut self) -> Result<CrawlReport, ScraperError> {
        let start_url = self.config.crawler.start_url.clone();
        let policy = self.config.output.conflict_policy;
        let page_limit = self.config.crawler.page_limit();

        tracing::info!(
            "Starting crawl at {} (fetch cap {}, detail cap {}, conflict policy {})",
            start_url,
            self.config.crawler.max_concurrent_fetches,
            self.config.crawler.max_concurrent_details,
            policy
        );

        let started = std::time::Instant::now();
        let mut report = CrawlReport::default();
        let mut visited: HashSet<String> = HashSet::new();
        let mut state = CrawlState::start(start_url);

        while !state.is_done() {
            let (Some(url), Some(page)) = (state.url().map(str::to_string), state.page()) else {
                break;
            };
            tracing::debug!("Crawl state: {}", state);
            visited.insert(url.clone());

            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::error!("Failed to fetch listing page {} ({}): {}", page, url, e);
                    self.finish_report(&mut report);
                    tracing::info!("Crawl stopped early: {}", report);
                    return Err(e);
                }
            };

            let listing = parse_listing(&html, &self.base_url);
            report.pages += 1;

            let batch = match self.pool.process_page(&listing.links).await {
                Ok(batch) => batch,
                Err(e) => {
                    self.finish_report(&mut report);
                    tracing::info!("Crawl stopped early: {}", report);
                    return Err(e);
                }
            };
            report.items_failed += batch.failed;

            let mut saved = 0;
            if !batch.items.is_empty() {
                match self.storage.save_batch(&batch.items, policy) {
                    Ok(outcome) => {
                        saved = outcome.saved;
                        report.items_saved += outcome.saved;
                        report.items_skipped += outcome.skipped;
                        report.batches_saved += 1;
                        tracing::debug!(
                            "Page {} created {} new cars",
                            page,
                            outcome.cars_created
                        );
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to persist page {} ({} items): {}",
                            page,
                            batch.items.len(),
                            e
                        );
                        report.batches_failed += 1;
                    }
                }
            }

            tracing::info!(
                "Page {}: {} links, {} saved, {} failed ({})",
                page,
                listing.links.len(),
                saved,
                batch.failed,
                url
            );

            let next = match listing.next {
                Some(next) if visited.contains(&next) => {
                    tracing::warn!("Next page {} was already visited, stopping", next);
                    None
                }
                Some(_) if page_limit.is_some_and(|limit| page >= limit) => {
                    tracing::info!("Reached page limit of {}", page);
                    None
                }
                next => next,
            };
            state = state.advance(next);
        }

        self.finish_report(&mut report);
        tracing::info!(
            "Crawl completed in {:?}: {} (total saved: {})",
            started.elapsed(),
            report,
            report.items_saved
        );
        tracing::debug!(
            "{} fetch attempts, peak {} concurrent fetches, peak {} concurrent details",
            report.fetch_attempts,
            report.peak_fetches,
            report.peak_details
        );

        Ok(report)
    }

    /// Shuts the phone revealer down; safe to call more than once
    pub async fn shutdown(&self) -> Result<(), ScraperError> {
        self.pool.gate().shutdown().await?;
        Ok(())
    }

    fn finish_report(&self, report: &mut CrawlReport) {
        report.fetch_attempts = self.fetcher.gauge().total();
        report.peak_fetches = self.fetcher.gauge().peak();
        report.peak_details = self.pool.gauge().peak();
    }
}

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the database and build the HTTP client
/// 2. Walk the listing pages and process every detail page
/// 3. Shut the phone revealer down, whether or not setup or the walk
///    succeeded
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `revealer` - The phone revealer to use for the whole run
///
/// # Example
///
/// ```no_run
/// use autoria_scraper::config::load_config;
/// use autoria_scraper::crawler::run_crawl;
/// use autoria_scraper::NoPhoneRevealer;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let report = run_crawl(config, NoPhoneRevealer).await?;
/// println!("saved {}", report.items_saved);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl<R: PhoneRevealer>(
    config: Config,
    revealer: R,
) -> Result<CrawlReport, ScraperError> {
    let gate = PhoneGate::new(revealer);
    let mut coordinator = match Coordinator::with_gate(config, gate.clone()) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            tracing::error!("Crawl setup failed: {}", e);
            if let Err(shutdown_error) = gate.shutdown().await {
                tracing::warn!("Phone revealer shutdown failed: {}", shutdown_error);
            }
            return Err(e);
        }
    };
    let result = coordinator.run().await;

    if let Err(e) = coordinator.shutdown().await {
        tracing::warn!("Phone revealer shutdown failed: {}", e);
    }

    result
}
