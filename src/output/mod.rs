//! Output module for reporting on the listing database
//!
//! This module handles:
//! - Loading store-wide statistics
//! - Printing them for the `--stats` mode

pub mod stats;

pub use stats::{load_statistics, print_statistics, StoreStatistics};
