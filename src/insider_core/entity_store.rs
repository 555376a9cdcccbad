//! Write-once insider classification cache backed by `insider_entities`
//!
//! Rows are keyed by normalized name and never updated. Concurrent creators
//! race on the UNIQUE constraint: the first commit wins and every loser
//! re-reads the surviving row instead of failing.

use super::classifier::{
    Classification, ClassificationSource, EntityType, FallbackClassifier, InsiderClassifier,
    StubAiClassifier,
};
use super::normalizer::{normalize_insider_name, InsiderFlags};
use crate::error::{InsiderError, Result};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::Serialize;

/// Cached classification for one normalized insider name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsiderEntity {
    pub id: i64,
    pub insider_id: Option<String>,
    pub normalized_name: String,
    pub entity_type: EntityType,
    pub is_fund_like: bool,
    pub source: ClassificationSource,
    pub confidence: f64,
    pub rationale: Option<String>,
    pub created_at: i64,
}

impl InsiderEntity {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let entity_type: String = row.get(3)?;
        let source: String = row.get(5)?;
        Ok(Self {
            id: row.get(0)?,
            insider_id: row.get(1)?,
            normalized_name: row.get(2)?,
            entity_type: EntityType::parse_stored(&entity_type),
            is_fund_like: row.get(4)?,
            source: ClassificationSource::parse_stored(&source),
            confidence: row.get(6)?,
            rationale: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

/// Resolves an insider to its (possibly freshly created) cached classification
pub trait EntityResolver {
    fn get_or_create(
        &self,
        insider_name: &str,
        title: &str,
        flags: &InsiderFlags,
        insider_id: Option<&str>,
    ) -> Result<InsiderEntity>;
}

pub struct SqliteEntityStore<'c, F = StubAiClassifier> {
    conn: &'c Connection,
    classifier: InsiderClassifier<F>,
}

impl<'c, F: FallbackClassifier> SqliteEntityStore<'c, F> {
    pub fn new(conn: &'c Connection, classifier: InsiderClassifier<F>) -> Self {
        Self { conn, classifier }
    }

    pub fn find(&self, normalized_name: &str) -> Result<Option<InsiderEntity>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, insider_id, normalized_name, entity_type, is_fund_like,
                    source, confidence, rationale, created_at
             FROM insider_entities
             WHERE normalized_name = ?1",
        )?;

        let entity = stmt
            .query_row([normalized_name], InsiderEntity::from_row)
            .optional()?;
        Ok(entity)
    }

    /// Insert a new classification; if another writer got there first,
    /// return their row instead.
    fn insert_or_fetch(
        &self,
        normalized_name: &str,
        insider_id: Option<&str>,
        classification: Classification,
    ) -> Result<InsiderEntity> {
        let created_at = chrono::Utc::now().timestamp();

        let inserted = self.conn.execute(
            "INSERT INTO insider_entities (
                insider_id, normalized_name, entity_type, is_fund_like,
                source, confidence, rationale, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                insider_id,
                normalized_name,
                classification.entity_type.as_str(),
                classification.is_fund_like,
                classification.source.as_str(),
                classification.confidence,
                classification.rationale,
                created_at,
            ],
        );

        match inserted {
            Ok(_) => Ok(InsiderEntity {
                id: self.conn.last_insert_rowid(),
                insider_id: insider_id.map(str::to_string),
                normalized_name: normalized_name.to_string(),
                entity_type: classification.entity_type,
                is_fund_like: classification.is_fund_like,
                source: classification.source,
                confidence: classification.confidence,
                rationale: Some(classification.rationale),
                created_at,
            }),
            Err(rusqlite::Error::SqliteFailure(err, msg))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                log::warn!(
                    "⚠️  Concurrent classification for '{}', re-reading existing row",
                    normalized_name
                );
                match self.find(normalized_name)? {
                    Some(existing) => Ok(existing),
                    None => Err(rusqlite::Error::SqliteFailure(err, msg).into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl<'c, F: FallbackClassifier> EntityResolver for SqliteEntityStore<'c, F> {
    /// Return the cached row for this name, classifying and persisting it on
    /// first encounter. Later calls never re-evaluate, even with new flags.
    fn get_or_create(
        &self,
        insider_name: &str,
        title: &str,
        flags: &InsiderFlags,
        insider_id: Option<&str>,
    ) -> Result<InsiderEntity> {
        let normalized_name = normalize_insider_name(insider_name);
        if normalized_name.is_empty() {
            return Err(InsiderError::InvalidInput(
                "insider_name is required for classification".to_string(),
            ));
        }

        if let Some(existing) = self.find(&normalized_name)? {
            return Ok(existing);
        }

        let classification = self.classifier.classify(insider_name, title, flags);
        log::debug!(
            "🏷️  Classified '{}' as {} (source={}, confidence={:.2})",
            normalized_name,
            classification.entity_type.as_str(),
            classification.source.as_str(),
            classification.confidence
        );

        self.insert_or_fetch(&normalized_name, insider_id, classification)
    }
}
