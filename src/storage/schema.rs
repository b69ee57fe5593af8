//! Database schema definitions
//!
//! Two tables: `cars` holds one immutable row per distinct detail URL, and
//! `observations` holds one append-only row per sighting of a car.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per distinct listing URL, written once at first sighting
CREATE TABLE IF NOT EXISTS cars (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    seller_name TEXT,
    main_image_url TEXT,
    first_seen_at TEXT NOT NULL
);

-- What a crawl pass saw for a car at a point in time
CREATE TABLE IF NOT EXISTS observations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    car_id INTEGER NOT NULL REFERENCES cars(id),
    observed_at TEXT NOT NULL,
    price_usd INTEGER,
    odometer_km INTEGER,
    phone_digits TEXT,
    plate TEXT,
    vin TEXT,
    UNIQUE(car_id, observed_at)
);

CREATE INDEX IF NOT EXISTS idx_observations_car ON observations(car_id);
CREATE INDEX IF NOT EXISTS idx_observations_observed_at ON observations(observed_at);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
