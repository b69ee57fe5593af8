//! Storage module for persisting crawl results
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Car identities keyed by listing URL
//! - Append-only listing observations
//! - Read-side queries for statistics and tests

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{format_timestamp, parse_timestamp, SqliteStorage};
pub use traits::{ListingStore, SaveOutcome, StorageError, StorageResult};

use crate::ScraperError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Opens (creating if needed) the listing database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(ScraperError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, ScraperError> {
    SqliteStorage::new(path)
}

/// A car as first seen, never updated afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarRecord {
    pub id: i64,
    pub url: String,
    /// Empty when the detail page had no title
    pub title: String,
    pub seller_name: Option<String>,
    pub main_image_url: Option<String>,
    pub first_seen_at: DateTime<Utc>,
}

/// One sighting of a car
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationRecord {
    pub id: i64,
    pub car_id: i64,
    pub observed_at: DateTime<Utc>,
    pub price_usd: Option<i64>,
    pub odometer_km: Option<i64>,
    pub phone_digits: Option<String>,
    pub plate: Option<String>,
    pub vin: Option<String>,
}

/// How a batch reacts to an observation that already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Abort the whole page
    #[default]
    RollbackPage,
    /// Drop only the colliding item and keep the rest of the page
    SkipItem,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RollbackPage => write!(f, "rollback-page"),
            Self::SkipItem => write!(f, "skip-item"),
        }
    }
}
