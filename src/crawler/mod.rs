//! Crawler module for listing and detail page processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a global cap and retry logic
//! - Listing page parsing (detail links and the pager)
//! - The bounded detail worker pool
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod gauge;
mod pagination;
mod retry;
mod worker;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use fetcher::{build_http_client, Fetcher};
pub use gauge::{ActivityGauge, GaugeGuard};
pub use pagination::{extract_links, next_page, parse_listing, ListingPage};
pub use retry::{RetryPolicy, RetryReason};
pub use worker::{DetailPool, Pacing, PageBatch};
