use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use crate::domain::models::{RawChangeRow, StationMetadata};

pub const LATEST_SCHEMA_VERSION: u32 = 1;

// The station_changes table is normally produced by the external change
// logger; it is created here too so demo and test databases can be built
// from scratch. The directory tables are this crate's metadata cache and
// never touch the source schema.
const MIGRATIONS: &[(u32, &str)] = &[(
    1,
    r#"
CREATE TABLE IF NOT EXISTS station_changes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL,
    old_state TEXT,
    new_state TEXT,
    old_product_id INTEGER,
    new_product_id INTEGER,
    changed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_station_changes_uuid_changed_at
ON station_changes (uuid, changed_at);

CREATE TABLE IF NOT EXISTS station_directory (
    uuid TEXT PRIMARY KEY,
    name TEXT,
    city_name TEXT,
    processor TEXT,
    graphic_names TEXT,
    free_trial INTEGER,
    product_number INTEGER,
    ram_bytes INTEGER,
    graphic_ram_bytes INTEGER,
    longitude REAL,
    latitude REAL,
    fetched_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS product_directory (
    product_id INTEGER PRIMARY KEY,
    title TEXT,
    fetched_at TEXT NOT NULL
);
"#,
)];

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unsupported schema version {current}; latest supported is {latest}")]
    UnsupportedSchemaVersion { current: u32, latest: u32 },
}

pub fn open_connection(path: &str) -> Result<Connection, DbError> {
    Connection::open(path).map_err(DbError::from)
}

pub fn run_migrations(connection: &mut Connection) -> Result<(), DbError> {
    let current_version = schema_version(connection)?;

    if current_version > LATEST_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            current: current_version,
            latest: LATEST_SCHEMA_VERSION,
        });
    }

    let transaction = connection.transaction()?;

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            transaction.execute_batch(sql)?;
            transaction.pragma_update(None, "user_version", version)?;
        }
    }

    transaction.commit()?;

    Ok(())
}

pub fn schema_version(connection: &Connection) -> Result<u32, DbError> {
    let version = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

/// Loads the full change log, ordered by station, then timestamp, then
/// insertion id so equal-timestamp ties stay in insertion order.
pub fn load_station_changes(connection: &Connection) -> Result<Vec<RawChangeRow>, DbError> {
    let mut statement = connection.prepare(
        "SELECT id, uuid, old_state, new_state, old_product_id, new_product_id, changed_at
         FROM station_changes
         ORDER BY uuid, changed_at, id",
    )?;

    let rows = statement.query_map([], |row| {
        Ok(RawChangeRow {
            id: row.get(0)?,
            station_id: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            old_state: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            new_state: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            old_product_id: row.get(4)?,
            new_product_id: row.get(5)?,
            changed_at: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        })
    })?;

    let mut changes = Vec::new();
    for row in rows {
        changes.push(row?);
    }

    Ok(changes)
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewChangeRow {
    pub station_id: String,
    pub old_state: Option<String>,
    pub new_state: Option<String>,
    pub old_product_id: Option<i64>,
    pub new_product_id: Option<i64>,
    pub changed_at: Option<String>,
}

pub fn insert_change_row(connection: &Connection, row: &NewChangeRow) -> Result<i64, DbError> {
    connection.execute(
        "INSERT INTO station_changes (uuid, old_state, new_state, old_product_id, new_product_id, changed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            row.station_id,
            row.old_state,
            row.new_state,
            row.old_product_id,
            row.new_product_id,
            row.changed_at,
        ],
    )?;

    Ok(connection.last_insert_rowid())
}

/// Distinct station ids seen in the change log; the directory sync job
/// fetches metadata for exactly this set.
pub fn gather_station_ids(connection: &Connection) -> Result<Vec<String>, DbError> {
    let mut statement = connection.prepare(
        "SELECT DISTINCT uuid FROM station_changes WHERE uuid IS NOT NULL AND uuid != '' ORDER BY uuid",
    )?;

    let rows = statement.query_map([], |row| row.get::<_, String>(0))?;

    let mut station_ids = Vec::new();
    for row in rows {
        station_ids.push(row?);
    }

    Ok(station_ids)
}

pub fn upsert_station_metadata(
    connection: &Connection,
    metadata: &StationMetadata,
    fetched_at: &str,
) -> Result<(), DbError> {
    connection.execute(
        "INSERT INTO station_directory
            (uuid, name, city_name, processor, graphic_names, free_trial,
             product_number, ram_bytes, graphic_ram_bytes, longitude, latitude, fetched_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(uuid) DO UPDATE SET
            name=excluded.name,
            city_name=excluded.city_name,
            processor=excluded.processor,
            graphic_names=excluded.graphic_names,
            free_trial=excluded.free_trial,
            product_number=excluded.product_number,
            ram_bytes=excluded.ram_bytes,
            graphic_ram_bytes=excluded.graphic_ram_bytes,
            longitude=excluded.longitude,
            latitude=excluded.latitude,
            fetched_at=excluded.fetched_at",
        params![
            metadata.station_id,
            metadata.name,
            metadata.city,
            metadata.processor,
            metadata.graphic_names,
            metadata.free_trial.map(i64::from),
            metadata.product_count,
            metadata.ram_bytes,
            metadata.graphic_ram_bytes,
            metadata.longitude,
            metadata.latitude,
            fetched_at,
        ],
    )?;

    Ok(())
}

pub fn load_station_directory(
    connection: &Connection,
) -> Result<BTreeMap<String, StationMetadata>, DbError> {
    let mut statement = connection.prepare(
        "SELECT uuid, name, city_name, processor, graphic_names, free_trial,
                product_number, ram_bytes, graphic_ram_bytes, longitude, latitude
         FROM station_directory",
    )?;

    let rows = statement.query_map([], |row| {
        Ok(StationMetadata {
            station_id: row.get(0)?,
            name: row.get(1)?,
            city: row.get(2)?,
            processor: row.get(3)?,
            graphic_names: row.get(4)?,
            free_trial: row.get::<_, Option<i64>>(5)?.map(|flag| flag != 0),
            product_count: row.get(6)?,
            ram_bytes: row.get(7)?,
            graphic_ram_bytes: row.get(8)?,
            longitude: row.get(9)?,
            latitude: row.get(10)?,
        })
    })?;

    let mut directory = BTreeMap::new();
    for row in rows {
        let metadata = row?;
        directory.insert(metadata.station_id.clone(), metadata);
    }

    Ok(directory)
}

pub fn upsert_product_title(
    connection: &Connection,
    product_id: i64,
    title: Option<&str>,
    fetched_at: &str,
) -> Result<(), DbError> {
    connection.execute(
        "INSERT INTO product_directory (product_id, title, fetched_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(product_id) DO UPDATE SET
            title=excluded.title,
            fetched_at=excluded.fetched_at",
        params![product_id, title, fetched_at],
    )?;

    Ok(())
}

pub fn load_product_titles(connection: &Connection) -> Result<BTreeMap<i64, String>, DbError> {
    let mut statement =
        connection.prepare("SELECT product_id, title FROM product_directory WHERE title IS NOT NULL")?;

    let rows = statement.query_map([], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut titles = BTreeMap::new();
    for row in rows {
        let (product_id, title) = row?;
        titles.insert(product_id, title);
    }

    Ok(titles)
}

pub fn count_change_rows(connection: &Connection) -> Result<i64, DbError> {
    let count = connection
        .query_row("SELECT COUNT(*) FROM station_changes", [], |row| row.get(0))
        .optional()?
        .unwrap_or(0);
    Ok(count)
}
