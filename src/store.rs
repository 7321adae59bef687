//! SQLite-backed store of accepted leak records.
//!
//! One table per shape; the schema matches the historical on-disk layout so
//! existing stores keep working. Entries are append-only. Every insert runs in
//! its own transaction with `synchronous = FULL`, so a returned id means the
//! row is on disk.
use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Local};
use rusqlite::{Connection, params_from_iter};

use crate::fingerprint::Fingerprint;
use crate::record::LeakRecord;
use crate::shape::RecordShape;

/// Stored timestamp layout.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("{record} record cannot be stored in a {store} store")]
    ShapeMismatch {
        record: RecordShape,
        store: RecordShape,
    },
    #[error("store holds {found} records; refusing to use it as a {expected} store")]
    ForeignStore {
        found: RecordShape,
        expected: RecordShape,
    },
}

pub struct Store {
    conn: Connection,
    shape: RecordShape,
}

impl Store {
    /// Open (or create) the store file and make sure the shape's table exists.
    pub fn open<P: AsRef<Path>>(path: P, shape: RecordShape) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, shape)
    }

    #[cfg(test)]
    pub fn open_in_memory(shape: RecordShape) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?, shape)
    }

    fn from_connection(conn: Connection, shape: RecordShape) -> Result<Self, StoreError> {
        conn.pragma_update(None, "synchronous", "FULL")?;
        for other in RecordShape::ALL.into_iter().filter(|s| *s != shape) {
            let present: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [other.table()],
                |row| row.get(0),
            )?;
            if present > 0 {
                return Err(StoreError::ForeignStore {
                    found: other,
                    expected: shape,
                });
            }
        }
        let store = Self { conn, shape };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn shape(&self) -> RecordShape {
        self.shape
    }

    /// Idempotent.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        self.conn.execute(self.shape.create_table_sql(), [])?;
        Ok(())
    }

    /// Append one entry and commit it before returning its id.
    pub fn insert(
        &mut self,
        record: &LeakRecord,
        fingerprint: &Fingerprint,
        timestamp: DateTime<Local>,
    ) -> Result<i64, StoreError> {
        if record.shape() != self.shape {
            return Err(StoreError::ShapeMismatch {
                record: record.shape(),
                store: self.shape,
            });
        }
        let ts = timestamp.format(TIMESTAMP_FORMAT).to_string();
        let mut values: Vec<&str> = vec![ts.as_str(), fingerprint.as_str()];
        values.extend(record.fields());

        let tx = self.conn.transaction()?;
        tx.execute(self.shape.insert_sql(), params_from_iter(values))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    pub fn load_fingerprints(&self) -> Result<HashSet<Fingerprint>, StoreError> {
        let mut stmt = self.conn.prepare(self.shape.select_hashes_sql())?;
        let rows = stmt.query_map([], |row| row.get::<_, Option<String>>(0))?;
        let mut out = HashSet::new();
        for hash in rows {
            if let Some(h) = hash? {
                out.insert(Fingerprint::from_stored(h));
            }
        }
        Ok(out)
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = self
            .conn
            .query_row(self.shape.count_sql(), [], |row| row.get(0))?;
        Ok(n as u64)
    }
}
