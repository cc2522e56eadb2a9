//! Persistent feature cache backed by SQLite.
//!
//! Two tables: `feature` holds normalized features keyed by id, and
//! `feature_index` maps lookup terms (coordinate strings, free-text queries)
//! to the feature they resolved to. Every write commits before returning.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{GeoError, Result};
use crate::models::{Address, BoundingBox, Feature, FeatureId, OsmType};
use crate::nominatim::TermType;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS feature (
    id TEXT PRIMARY KEY,
    osm_id INTEGER NOT NULL,
    osm_type TEXT NOT NULL,
    name TEXT NOT NULL,
    address TEXT,
    place_rank INTEGER,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    bounding_box TEXT,
    polygon TEXT
);

CREATE TABLE IF NOT EXISTS feature_index (
    term TEXT NOT NULL,
    term_type TEXT NOT NULL,
    feature_id TEXT NOT NULL REFERENCES feature (id) ON DELETE CASCADE,
    PRIMARY KEY (term, term_type)
);

CREATE INDEX IF NOT EXISTS feature_index_feature_id ON feature_index (feature_id);
";

const FEATURE_COLUMNS: &str = "feature.id, feature.osm_id, feature.osm_type, feature.name, \
     feature.address, feature.place_rank, feature.latitude, feature.longitude, \
     feature.bounding_box, feature.polygon";

/// SQLite limits bound parameters per statement; stay well below it.
const MAX_IDS_PER_QUERY: usize = 500;

/// Feature row as read from SQLite, before JSON columns are decoded
struct FeatureRow {
    id: String,
    osm_id: i64,
    osm_type: String,
    name: String,
    address: Option<String>,
    place_rank: Option<i64>,
    latitude: f64,
    longitude: f64,
    bounding_box: Option<String>,
    polygon: Option<String>,
}

impl FeatureRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            osm_id: row.get(1)?,
            osm_type: row.get(2)?,
            name: row.get(3)?,
            address: row.get(4)?,
            place_rank: row.get(5)?,
            latitude: row.get(6)?,
            longitude: row.get(7)?,
            bounding_box: row.get(8)?,
            polygon: row.get(9)?,
        })
    }

    fn into_feature(self) -> Result<Feature> {
        let osm_type = OsmType::from_name(&self.osm_type).ok_or_else(|| {
            GeoError::InvalidFeature(format!(
                "cached feature {} has element type '{}'",
                self.id, self.osm_type
            ))
        })?;

        Ok(Feature {
            id: FeatureId::parse(&self.id)?,
            osm_type,
            osm_id: self.osm_id,
            name: self.name,
            address: decode_json::<Address>(self.address)?,
            place_rank: self.place_rank,
            latitude: self.latitude,
            longitude: self.longitude,
            bounding_box: decode_json::<BoundingBox>(self.bounding_box)?,
            polygon: decode_json::<serde_json::Value>(self.polygon)?,
        })
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(column: Option<String>) -> Result<Option<T>> {
    match column {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

fn encode_json<T: serde::Serialize>(value: Option<&T>) -> Result<Option<String>> {
    match value {
        Some(value) => Ok(Some(serde_json::to_string(value)?)),
        None => Ok(None),
    }
}

/// Disk-backed cache of resolved features.
///
/// Owned by the run and lent to the geocoder; dropping it closes the
/// connection.
pub struct FeatureCache {
    conn: Connection,
    path: Option<PathBuf>,
}

impl FeatureCache {
    /// Open (creating if needed) the cache database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening feature cache at {}", path.display());

        let conn = Connection::open(path)?;
        let cache = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        cache.init_schema()?;
        Ok(cache)
    }

    /// Throwaway cache, used by tests and dry runs without a work dir
    pub fn open_in_memory() -> Result<Self> {
        let cache = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        cache.init_schema()?;
        Ok(cache)
    }

    fn init_schema(&self) -> Result<()> {
        let table_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
            [],
            |row| row.get(0),
        )?;

        if table_count == 0 {
            debug!("Applying feature cache schema");
            self.conn.execute_batch(SCHEMA)?;
        }

        self.conn.pragma_update(None, "foreign_keys", "ON")?;

        // A file created by something else is an integrity error
        let feature_tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type = 'table' AND name IN ('feature', 'feature_index')",
            [],
            |row| row.get(0),
        )?;
        if feature_tables != 2 {
            return Err(GeoError::Config(format!(
                "feature cache {} has an unexpected schema",
                self.path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| ":memory:".to_string())
            )));
        }

        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get_by_id(&self, id: &FeatureId) -> Result<Option<Feature>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM feature WHERE id = ?1", FEATURE_COLUMNS),
                params![id.as_str()],
                FeatureRow::from_row,
            )
            .optional()?;

        row.map(FeatureRow::into_feature).transpose()
    }

    /// Fetch several features at once; ids not in the cache are skipped.
    pub fn get_by_ids(&self, ids: &[FeatureId]) -> Result<Vec<Feature>> {
        let mut features = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
            let placeholders: Vec<String> = (1..=chunk.len()).map(|i| format!("?{}", i)).collect();
            let query = format!(
                "SELECT {} FROM feature WHERE id IN ({}) ORDER BY id",
                FEATURE_COLUMNS,
                placeholders.join(", ")
            );

            let mut stmt = self.conn.prepare(&query)?;
            let rows = stmt.query_map(
                params_from_iter(chunk.iter().map(|id| id.as_str())),
                FeatureRow::from_row,
            )?;
            for row in rows {
                features.push(row?.into_feature()?);
            }
        }

        Ok(features)
    }

    /// Feature previously saved under `term`, whatever its term type
    pub fn find_by_term(&self, term: &str) -> Result<Option<Feature>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM feature_index
                     INNER JOIN feature ON feature_index.feature_id = feature.id
                     WHERE feature_index.term = ?1
                     LIMIT 1",
                    FEATURE_COLUMNS
                ),
                params![term],
                FeatureRow::from_row,
            )
            .optional()?;

        row.map(FeatureRow::into_feature).transpose()
    }

    /// Insert a feature, and optionally the term that found it.
    ///
    /// Both inserts are insert-or-ignore and share one transaction, so a
    /// repeated save is a no-op and a crash never leaves an index row
    /// without its feature.
    pub fn save(&self, feature: &Feature, term: Option<(&str, TermType)>) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO feature (
                id, osm_id, osm_type, name, address, place_rank,
                latitude, longitude, bounding_box, polygon
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                feature.id.as_str(),
                feature.osm_id,
                feature.osm_type.to_string(),
                feature.name,
                encode_json(feature.address.as_ref())?,
                feature.place_rank,
                feature.latitude,
                feature.longitude,
                encode_json(feature.bounding_box.as_ref())?,
                encode_json(feature.polygon.as_ref())?,
            ],
        )?;

        if let Some((term, term_type)) = term {
            tx.execute(
                "INSERT OR IGNORE INTO feature_index (term, term_type, feature_id)
                 VALUES (?1, ?2, ?3)",
                params![term, term_type.as_str(), feature.id.as_str()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Remove one feature and every term pointing at it
    pub fn delete_feature(&self, id: &FeatureId) -> Result<()> {
        self.conn
            .execute("DELETE FROM feature WHERE id = ?1", params![id.as_str()])?;
        Ok(())
    }

    pub fn delete_all(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM feature_index", [])?;
        tx.execute("DELETE FROM feature", [])?;
        tx.commit()?;
        Ok(())
    }

    pub fn feature_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM feature", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Delete the cache database file entirely.
    pub fn delete_store<P: AsRef<Path>>(path: P) -> Result<bool> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path).map_err(|e| GeoError::io(path, e))?;
        info!("Deleted feature cache {}", path.display());
        Ok(true)
    }
}
