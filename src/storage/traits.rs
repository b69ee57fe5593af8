//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::extract::ScrapedItem;
use crate::storage::{CarRecord, ConflictPolicy, ObservationRecord};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Observation of {url} at {observed_at} already exists")]
    Conflict { url: String, observed_at: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Car not found: {0}")]
    CarNotFound(i64),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// What a committed batch wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Observations written
    pub saved: usize,
    /// Items dropped under `ConflictPolicy::SkipItem`
    pub skipped: usize,
    /// Car identities created by this batch
    pub cars_created: usize,
}

/// Trait for listing store implementations
pub trait ListingStore {
    /// Persists one page worth of items in a single transaction
    ///
    /// For every item the car is looked up by URL and created if missing,
    /// then a new observation is appended. Nothing is visible to other
    /// connections until the whole batch commits.
    ///
    /// # Returns
    ///
    /// * `Ok(SaveOutcome)` - The batch committed
    /// * `Err(StorageError::Conflict)` - An observation collided under
    ///   `ConflictPolicy::RollbackPage`; nothing from the batch was kept
    /// * `Err(_)` - Any other failure; nothing from the batch was kept
    fn save_batch(
        &mut self,
        items: &[ScrapedItem],
        policy: ConflictPolicy,
    ) -> StorageResult<SaveOutcome>;

    /// Gets a car by its listing URL
    fn get_car_by_url(&self, url: &str) -> StorageResult<Option<CarRecord>>;

    /// Gets a car by ID
    fn get_car(&self, car_id: i64) -> StorageResult<CarRecord>;

    /// Gets every observation of a car, oldest first
    fn get_observations(&self, car_id: i64) -> StorageResult<Vec<ObservationRecord>>;

    fn count_cars(&self) -> StorageResult<u64>;

    fn count_observations(&self) -> StorageResult<u64>;

    /// Counts observations that carry a revealed phone
    fn count_observations_with_phone(&self) -> StorageResult<u64>;

    /// Timestamp of the most recent observation, if any
    fn latest_observation_at(&self) -> StorageResult<Option<DateTime<Utc>>>;
}
