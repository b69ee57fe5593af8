//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ListingStore trait.

use crate::extract::ScrapedItem;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ListingStore, SaveOutcome, StorageError, StorageResult};
use crate::storage::{CarRecord, ConflictPolicy, ObservationRecord};
use crate::ScraperError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(ScraperError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, ScraperError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, ScraperError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl ListingStore for SqliteStorage {
    fn save_batch(
        &mut self,
        items: &[ScrapedItem],
        policy: ConflictPolicy,
    ) -> StorageResult<SaveOutcome> {
        let mut tx = self.conn.transaction()?;
        let mut outcome = SaveOutcome::default();

        for item in items {
            match policy {
                ConflictPolicy::RollbackPage => {
                    // Returning early drops the transaction, which rolls it back
                    let created = insert_item(&tx, item)?;
                    outcome.saved += 1;
                    outcome.cars_created += usize::from(created);
                }
                ConflictPolicy::SkipItem => {
                    let savepoint = tx.savepoint()?;
                    match insert_item(&savepoint, item) {
                        Ok(created) => {
                            savepoint.commit()?;
                            outcome.saved += 1;
                            outcome.cars_created += usize::from(created);
                        }
                        Err(StorageError::Conflict { url, observed_at }) => {
                            // Dropping the savepoint undoes this item only
                            drop(savepoint);
                            tracing::warn!(
                                "Skipping duplicate observation of {} at {}",
                                url,
                                observed_at
                            );
                            outcome.skipped += 1;
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        tx.commit()?;
        Ok(outcome)
    }

    fn get_car_by_url(&self, url: &str) -> StorageResult<Option<CarRecord>> {
        let car = self
            .conn
            .query_row(
                "SELECT id, url, title, seller_name, main_image_url, first_seen_at
                 FROM cars WHERE url = ?1",
                params![url],
                car_from_row,
            )
            .optional()?;

        Ok(car)
    }

    fn get_car(&self, car_id: i64) -> StorageResult<CarRecord> {
        self.conn
            .query_row(
                "SELECT id, url, title, seller_name, main_image_url, first_seen_at
                 FROM cars WHERE id = ?1",
                params![car_id],
                car_from_row,
            )
            .optional()?
            .ok_or(StorageError::CarNotFound(car_id))
    }

    fn get_observations(&self, car_id: i64) -> StorageResult<Vec<ObservationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, car_id, observed_at, price_usd, odometer_km, phone_digits, plate, vin
             FROM observations WHERE car_id = ?1 ORDER BY observed_at, id",
        )?;

        let rows = stmt.query_map(params![car_id], observation_from_row)?;

        let mut observations = Vec::new();
        for row in rows {
            observations.push(row?);
        }

        Ok(observations)
    }

    fn count_cars(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cars", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_observations(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM observations", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_observations_with_phone(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM observations WHERE phone_digits IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn latest_observation_at(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let latest: Option<String> =
            self.conn
                .query_row("SELECT MAX(observed_at) FROM observations", [], |row| {
                    row.get(0)
                })?;

        latest
            .map(|text| {
                parse_timestamp(&text).map_err(|e| {
                    StorageError::Database(format!("bad timestamp '{}': {}", text, e))
                })
            })
            .transpose()
    }
}

/// Writes one item; returns true if the car identity was created
fn insert_item(conn: &Connection, item: &ScrapedItem) -> StorageResult<bool> {
    let observed_at = format_timestamp(&item.observed_at);
    let fields = &item.fields;

    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM cars WHERE url = ?1",
            params![item.url],
            |row| row.get(0),
        )
        .optional()?;

    let (car_id, created) = match existing {
        Some(id) => (id, false),
        None => {
            conn.execute(
                "INSERT INTO cars (url, title, seller_name, main_image_url, first_seen_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    item.url,
                    fields.title.as_deref().unwrap_or(""),
                    fields.seller_name,
                    fields.main_image_url,
                    observed_at
                ],
            )?;
            (conn.last_insert_rowid(), true)
        }
    };

    conn.execute(
        "INSERT INTO observations
         (car_id, observed_at, price_usd, odometer_km, phone_digits, plate, vin)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            car_id,
            observed_at,
            fields.price_usd,
            fields.odometer_km,
            item.phone,
            fields.plate,
            fields.vin
        ],
    )
    .map_err(|e| classify_insert_error(e, &item.url, &observed_at))?;

    Ok(created)
}

/// Unique-key collisions become `Conflict`; everything else stays a SQLite error
fn classify_insert_error(error: rusqlite::Error, url: &str, observed_at: &str) -> StorageError {
    match &error {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StorageError::Conflict {
                url: url.to_string(),
                observed_at: observed_at.to_string(),
            }
        }
        _ => StorageError::Sqlite(error),
    }
}

fn car_from_row(row: &Row<'_>) -> rusqlite::Result<CarRecord> {
    Ok(CarRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        seller_name: row.get(3)?,
        main_image_url: row.get(4)?,
        first_seen_at: timestamp_column(row, 5)?,
    })
}

fn observation_from_row(row: &Row<'_>) -> rusqlite::Result<ObservationRecord> {
    Ok(ObservationRecord {
        id: row.get(0)?,
        car_id: row.get(1)?,
        observed_at: timestamp_column(row, 2)?,
        price_usd: row.get(3)?,
        odometer_km: row.get(4)?,
        phone_digits: row.get(5)?,
        plate: row.get(6)?,
        vin: row.get(7)?,
    })
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_timestamp(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// RFC 3339 in UTC with microseconds; sorts chronologically as text
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(text).map(|ts| ts.with_timezone(&Utc))
}
