use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags};
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::{Connector, ListingSource, LoadSession, SqliteConfig};
use crate::model::{GeoBounds, Listing, PricedPoint, StoredListing};
use crate::{Error, Result};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS properties (
    id            INTEGER PRIMARY KEY,
    title         TEXT    NOT NULL,
    price         REAL    NOT NULL,
    latitude      REAL    NOT NULL,
    longitude     REAL    NOT NULL,
    property_type TEXT    NOT NULL,
    rooms         INTEGER,
    area          REAL
);
CREATE INDEX IF NOT EXISTS idx_properties_lat_lng ON properties (latitude, longitude);
"#;

const INSERT_SQL: &str = r#"
INSERT INTO properties (id, title, price, latitude, longitude, property_type, rooms, area)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
"#;

const POINTS_SQL: &str = r#"
SELECT id, latitude, longitude, price
FROM properties
WHERE latitude BETWEEN ?1 AND ?2
  AND longitude BETWEEN ?3 AND ?4
ORDER BY id
"#;

const LISTINGS_SQL: &str = r#"
SELECT id, title, price, latitude, longitude, property_type, rooms, area
FROM properties
WHERE latitude BETWEEN ?1 AND ?2
  AND longitude BETWEEN ?3 AND ?4
ORDER BY id
LIMIT ?5
"#;

/// Hands out one fresh SQLite connection per caller.
#[derive(Clone, Debug)]
pub struct SqliteConnector {
    config: SqliteConfig,
}

impl SqliteConnector {
    pub fn new(config: SqliteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }
}

impl Connector for SqliteConnector {
    type Session = SqliteSession;

    fn connect(&self) -> Result<SqliteSession> {
        let conn = Connection::open(&self.config.path)
            .map_err(|e| Error::Storage(format!("Open {} failed: {e}", self.config.path)))?;
        conn.busy_timeout(self.config.busy_timeout)?;

        // WAL lets the readers keep going while a worker holds the write lock.
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        debug!(path = %self.config.path, journal_mode = %mode, "Opened store session");

        Ok(SqliteSession { conn })
    }
}

pub struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    /// Creates the `properties` table and its coordinate index when missing.
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM properties", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

impl LoadSession for SqliteSession {
    fn clear_all(&mut self) -> Result<()> {
        let removed = self.conn.execute("DELETE FROM properties", [])?;
        debug!(removed, "Cleared properties table");
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        // IMMEDIATE takes the write lock up front so commit never has to upgrade.
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| Error::Transaction(format!("begin failed: {e}")))
    }

    fn insert(&mut self, listing: &Listing) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(INSERT_SQL)?;
        stmt.execute(params![
            listing.id,
            listing.title(),
            listing.price,
            listing.latitude,
            listing.longitude,
            listing.property_type.label(),
            listing.rooms,
            listing.area,
        ])?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| Error::Transaction(format!("commit failed: {e}")))
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| Error::Transaction(format!("rollback failed: {e}")))
    }
}

/// Single connection shared by all queries. It never writes; opening
/// without `CREATE` makes a missing database an error instead of an empty file.
#[derive(Clone)]
pub struct SqliteReader {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteReader {
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let conn = Connection::open_with_flags(
            &config.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| Error::Storage(format!("Open {} failed: {e}", config.path)))?;
        conn.busy_timeout(config.busy_timeout)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| Error::Storage("reader connection poisoned".to_string()))?;
            f(&guard)
        })
        .await?
    }
}

#[async_trait]
impl ListingSource for SqliteReader {
    async fn points_in_bounds(&self, bounds: GeoBounds) -> Result<Vec<PricedPoint>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(POINTS_SQL)?;
            let rows = stmt.query_map(
                params![bounds.min_lat, bounds.max_lat, bounds.min_lng, bounds.max_lng],
                |row| {
                    Ok(PricedPoint {
                        id: row.get(0)?,
                        latitude: row.get(1)?,
                        longitude: row.get(2)?,
                        price: row.get(3)?,
                    })
                },
            )?;

            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })
        .await
    }

    async fn listings_in_bounds(
        &self,
        bounds: GeoBounds,
        limit: usize,
    ) -> Result<Vec<StoredListing>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(LISTINGS_SQL)?;
            let rows = stmt.query_map(
                params![
                    bounds.min_lat,
                    bounds.max_lat,
                    bounds.min_lng,
                    bounds.max_lng,
                    limit
                ],
                |row| {
                    Ok(StoredListing {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        price: row.get(2)?,
                        latitude: row.get(3)?,
                        longitude: row.get(4)?,
                        property_type: row.get(5)?,
                        rooms: row.get(6)?,
                        area: row.get(7)?,
                    })
                },
            )?;

            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })
        .await
    }
}
