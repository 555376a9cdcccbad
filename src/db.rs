//! SQLite handle and schema loader
//!
//! The schema ships inside the binary (`sql/*.sql`) and every file uses
//! `IF NOT EXISTS`, so `init_schema` is safe to run on each start.

use crate::error::Result;
use crate::insider_core::classifier::{FallbackClassifier, InsiderClassifier, StubAiClassifier};
use crate::insider_core::detector::ClusterDetector;
use crate::insider_core::entity_store::SqliteEntityStore;
use crate::insider_core::exclusions::ExclusionList;
use crate::insider_core::sqlite_reader::SqliteSignalStore;
use crate::insider_core::sqlite_writer::SignalWriter;
use crate::sqlite_pragma::apply_optimized_pragmas;
use rusqlite::Connection;
use std::path::Path;

/// Schema files in execution order
const SCHEMA_FILES: [(&str, &str); 4] = [
    (
        "01_insider_buy_signals.sql",
        include_str!("../sql/01_insider_buy_signals.sql"),
    ),
    (
        "02_insider_exclusions.sql",
        include_str!("../sql/02_insider_exclusions.sql"),
    ),
    (
        "03_insider_entities.sql",
        include_str!("../sql/03_insider_entities.sql"),
    ),
    (
        "04_ingested_batches.sql",
        include_str!("../sql/04_ingested_batches.sql"),
    ),
];

/// Owned SQLite connection plus accessors for each store
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file and apply connection PRAGMAs
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        apply_optimized_pragmas(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_optimized_pragmas(&conn)?;
        Ok(Self { conn })
    }

    /// Create all tables and indexes
    pub fn init_schema(&self) -> Result<()> {
        log::info!("🔧 Running schema migrations");

        for (filename, sql) in SCHEMA_FILES {
            log::debug!("   ├─ Executing: {}", filename);
            self.conn.execute_batch(sql)?;
        }

        log::info!("✅ Schema ready ({} files)", SCHEMA_FILES.len());
        Ok(())
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Read side of the buy-signal store
    pub fn signals(&self) -> SqliteSignalStore<'_> {
        SqliteSignalStore::new(&self.conn)
    }

    /// Batch-idempotent writer into the buy-signal store
    pub fn writer(&self) -> SignalWriter<'_> {
        SignalWriter::new(&self.conn)
    }

    pub fn exclusions(&self) -> ExclusionList<'_> {
        ExclusionList::new(&self.conn)
    }

    /// Classification cache using the default rules + stub fallback
    pub fn entities(&self) -> SqliteEntityStore<'_, StubAiClassifier> {
        SqliteEntityStore::new(&self.conn, InsiderClassifier::new())
    }

    /// Classification cache with a caller-supplied fallback policy
    pub fn entities_with<F: FallbackClassifier>(
        &self,
        classifier: InsiderClassifier<F>,
    ) -> SqliteEntityStore<'_, F> {
        SqliteEntityStore::new(&self.conn, classifier)
    }

    /// Detection engine wired to this database's stores
    pub fn detector(&self) -> ClusterDetector<SqliteSignalStore<'_>, SqliteEntityStore<'_>> {
        ClusterDetector::new(self.signals(), self.entities())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_schema_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.init_schema().unwrap();
        db.init_schema().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();

        assert_eq!(
            tables,
            vec![
                "ingested_batches",
                "insider_buy_signals",
                "insider_entities",
                "insider_exclusions",
            ]
        );
    }

    #[test]
    fn test_open_creates_parent_dir() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("insiders.db");

        let db = Database::open(&db_path).unwrap();
        db.init_schema().unwrap();

        assert!(db_path.exists());
    }
}
