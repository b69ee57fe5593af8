//! Statistics generation from the listing database
//!
//! This module provides functionality for extracting and displaying
//! store statistics from the storage layer.

use crate::storage::ListingStore;
use crate::ScraperError;
use chrono::{DateTime, Utc};

/// Store statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatistics {
    /// Distinct cars (listing URLs) ever seen
    pub cars: u64,

    /// Observations across all runs
    pub observations: u64,

    /// Observations that carry a revealed phone
    pub observations_with_phone: u64,

    /// Most recent observation time
    pub latest_observation_at: Option<DateTime<Utc>>,
}

impl StoreStatistics {
    /// Share of observations with a phone, in percent
    pub fn phone_coverage(&self) -> f64 {
        if self.observations == 0 {
            0.0
        } else {
            self.observations_with_phone as f64 / self.observations as f64 * 100.0
        }
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(ScraperError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn ListingStore) -> Result<StoreStatistics, ScraperError> {
    Ok(StoreStatistics {
        cars: storage.count_cars()?,
        observations: storage.count_observations()?,
        observations_with_phone: storage.count_observations_with_phone()?,
        latest_observation_at: storage.latest_observation_at()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Listing Store Statistics ===\n");

    println!("Overview:");
    println!("  Cars: {}", stats.cars);
    println!("  Observations: {}", stats.observations);
    println!(
        "  With phone: {} ({:.1}%)",
        stats.observations_with_phone,
        stats.phone_coverage()
    );

    match stats.latest_observation_at {
        Some(at) => println!("  Latest observation: {}", at.to_rfc3339()),
        None => println!("  Latest observation: never"),
    }
}
