//! Autoria-Scraper: a listing crawler for used-car classifieds
//!
//! This crate walks the paginated listing pages of a car classifieds site,
//! extracts a structured record from every detail page, reveals seller phone
//! numbers through a single shared headless browser, and stores the results
//! in SQLite with car identities deduplicated by URL.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Autoria-Scraper operations
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch of {url} gave up after {attempts} attempts ({reason})")]
    FetchExhausted {
        url: String,
        attempts: u32,
        reason: crawler::RetryReason,
    },

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("Browser automation error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task error: {0}")]
    Task(String),
}

impl ScraperError {
    /// Returns true if this error must stop the whole crawl rather than
    /// just the item or page that raised it
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, Self::Browser(_))
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Autoria-Scraper operations
pub type Result<T> = std::result::Result<T, ScraperError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use browser::{BrowserSession, NoPhoneRevealer, PhoneGate, PhoneRevealer};
pub use config::Config;
pub use crawler::{Coordinator, CrawlReport};
pub use extract::{DetailFields, ScrapedItem};
pub use state::CrawlState;
pub use storage::{ConflictPolicy, ListingStore, SqliteStorage};
