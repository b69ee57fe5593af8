//! Detail worker pool
//!
//! Fans a listing page's links out into one task per detail page and joins
//! them back into a `PageBatch`. Each task:
//! 1. Waits for a detail slot (independent of the fetch cap)
//! 2. Fetches the detail document and runs the field extractors
//! 3. Reveals the phone through the shared `PhoneGate`
//! 4. Pauses for a random pacing interval, then stamps the observation time
//!
//! A failed item is logged and counted; it never fails the page. A browser
//! failure is the exception: it aborts the remaining tasks and ends the run.

use crate::browser::{PhoneGate, PhoneRevealer};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::gauge::ActivityGauge;
use crate::extract::{DetailFields, ScrapedItem};
use crate::ScraperError;
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Results of one listing page's detail tasks
#[derive(Debug, Default)]
pub struct PageBatch {
    /// Successful items, in completion order
    pub items: Vec<ScrapedItem>,
    /// Items that were dropped after a fetch error or task panic
    pub failed: usize,
}

/// Random pause taken after every phone reveal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub min: Duration,
    pub max: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(100),
            max: Duration::from_millis(300),
        }
    }
}

impl Pacing {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min: min.min(max),
            max,
        }
    }

    /// Uniform sample from `[min, max]`
    pub fn sample(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if min >= max {
            return self.min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

/// Bounded pool of detail page tasks
pub struct DetailPool<R> {
    fetcher: Arc<Fetcher>,
    gate: PhoneGate<R>,
    permits: Arc<Semaphore>,
    pacing: Pacing,
    gauge: ActivityGauge,
}

impl<R: PhoneRevealer> DetailPool<R> {
    /// Creates a pool
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Shared fetcher; its own cap still applies to every request
    /// * `gate` - Exclusive handle to the phone revealer
    /// * `max_active` - Maximum detail pages processed at once
    pub fn new(fetcher: Arc<Fetcher>, gate: PhoneGate<R>, max_active: usize) -> Self {
        Self {
            fetcher,
            gate,
            permits: Arc::new(Semaphore::new(max_active.max(1))),
            pacing: Pacing::default(),
            gauge: ActivityGauge::new(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Gauge of active detail tasks
    pub fn gauge(&self) -> &ActivityGauge {
        &self.gauge
    }

    pub fn gate(&self) -> &PhoneGate<R> {
        &self.gate
    }

    /// Processes every link of one listing page
    ///
    /// # Returns
    ///
    /// * `Ok(PageBatch)` - All tasks finished; failed items are only counted
    /// * `Err(ScraperError::Browser)` - The browser session broke; the
    ///   remaining tasks were aborted
    pub async fn process_page(&self, links: &[String]) -> Result<PageBatch, ScraperError> {
        let mut tasks = JoinSet::new();

        for url in links {
            let fetcher = Arc::clone(&self.fetcher);
            let gate = self.gate.clone();
            let permits = Arc::clone(&self.permits);
            let gauge = self.gauge.clone();
            let pacing = self.pacing;
            let url = url.clone();

            tasks.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => {
                        let _active = gauge.enter();
                        process_detail(&fetcher, &gate, &url, pacing).await
                    }
                    Err(e) => Err(ScraperError::Task(format!("detail permits closed: {}", e))),
                };
                (url, result)
            });
        }

        let mut batch = PageBatch::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(item))) => batch.items.push(item),
                Ok((url, Err(e))) if e.is_run_fatal() => {
                    tracing::error!("Browser failure while processing {}: {}", url, e);
                    tasks.abort_all();
                    return Err(e);
                }
                Ok((url, Err(e))) => {
                    tracing::warn!("Skipping {}: {}", url, e);
                    batch.failed += 1;
                }
                Err(e) => {
                    tracing::warn!("Detail task did not complete: {}", e);
                    batch.failed += 1;
                }
            }
        }

        Ok(batch)
    }
}

/// Turns one detail URL into a `ScrapedItem`
async fn process_detail<R: PhoneRevealer>(
    fetcher: &Fetcher,
    gate: &PhoneGate<R>,
    url: &str,
    pacing: Pacing,
) -> Result<ScrapedItem, ScraperError> {
    let html = fetcher.fetch(url).await?;
    let fields = DetailFields::from_html(&html);

    let phone = gate.reveal(url).await?;

    tokio::time::sleep(pacing.sample()).await;

    tracing::debug!(
        "Scraped {} (title: {:?}, price: {:?}, images: {}, phone: {})",
        url,
        fields.title,
        fields.price_usd,
        fields.image_count,
        if phone.is_some() { "yes" } else { "no" }
    );

    Ok(ScrapedItem::new(url, fields, phone, Utc::now()))
}
