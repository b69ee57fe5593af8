use serde::Deserialize;
use std::time::Duration;

use crate::storage::ConflictPolicy;

/// Main configuration structure for Autoria-Scraper
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// First listing page of the crawl
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Base used to resolve relative detail and pager links (defaults to start-url)
    #[serde(rename = "base-url", default)]
    pub base_url: Option<String>,

    /// Maximum number of HTTP requests in flight across the whole run
    #[serde(rename = "max-concurrent-fetches", default = "default_concurrency")]
    pub max_concurrent_fetches: u32,

    /// Maximum number of detail pages processed at once
    #[serde(rename = "max-concurrent-details", default = "default_concurrency")]
    pub max_concurrent_details: u32,

    /// Attempts per fetch, including the first one
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay of the retry backoff (milliseconds)
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Lower bound of the pause after each phone reveal (milliseconds)
    #[serde(rename = "pacing-min-ms", default = "default_pacing_min_ms")]
    pub pacing_min_ms: u64,

    /// Upper bound of the pause after each phone reveal (milliseconds)
    #[serde(rename = "pacing-max-ms", default = "default_pacing_max_ms")]
    pub pacing_max_ms: u64,

    /// Stop after this many listing pages; 0 means no limit
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,
}

impl CrawlerConfig {
    /// Base URL for link resolution, falling back to the start URL
    pub fn effective_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(&self.start_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// Page limit with the "0 = unlimited" convention applied
    pub fn page_limit(&self) -> Option<u32> {
        self.max_pages.filter(|&n| n > 0)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Headless browser settings for the phone reveal step
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// Launch a browser at all; when false phones are never revealed
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Explicit Chrome/Chromium binary; auto-detected when absent
    #[serde(rename = "chrome-executable", default)]
    pub chrome_executable: Option<String>,

    #[serde(rename = "page-load-timeout-secs", default = "default_page_load_timeout")]
    pub page_load_timeout_secs: u64,

    /// How long to wait for the dismissible overlay to show up
    #[serde(rename = "overlay-timeout-secs", default = "default_overlay_timeout")]
    pub overlay_timeout_secs: u64,

    /// How long to wait for the overlay to go away and for the phone to appear
    #[serde(rename = "wait-timeout-secs", default = "default_wait_timeout")]
    pub wait_timeout_secs: u64,

    #[serde(rename = "poll-interval-ms", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            headless: true,
            chrome_executable: None,
            page_load_timeout_secs: default_page_load_timeout(),
            overlay_timeout_secs: default_overlay_timeout(),
            wait_timeout_secs: default_wait_timeout(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// What to do when an observation collides with an existing one
    #[serde(rename = "conflict-policy", default)]
    pub conflict_policy: ConflictPolicy,
}

fn default_concurrency() -> u32 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    10
}

fn default_pacing_min_ms() -> u64 {
    100
}

fn default_pacing_max_ms() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_page_load_timeout() -> u64 {
    15
}

fn default_overlay_timeout() -> u64 {
    3
}

fn default_wait_timeout() -> u64 {
    10
}

fn default_poll_interval_ms() -> u64 {
    200
}
