//! Insider exclusion list backed by `insider_exclusions`
//!
//! Any active pattern that appears (case-insensitively) anywhere in an
//! insider's name removes that insider's transactions from detection.
//! Patterns are re-read on every detection run, so edits apply immediately.

use crate::error::{InsiderError, Result};
use rusqlite::{params, Connection};

#[derive(Debug, Clone, PartialEq)]
pub struct ExclusionEntry {
    pub id: i64,
    pub pattern: String,
    pub active: bool,
    pub reason: Option<String>,
    pub created_at: i64,
}

/// Admin operations on the exclusion table
pub struct ExclusionList<'c> {
    conn: &'c Connection,
}

impl<'c> ExclusionList<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Add a pattern, or re-activate it if it already exists
    pub fn add_pattern(&self, pattern: &str, reason: Option<&str>) -> Result<()> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(InsiderError::InvalidInput(
                "exclusion pattern must not be blank".to_string(),
            ));
        }

        self.conn.execute(
            "INSERT INTO insider_exclusions (pattern, active, reason, created_at)
             VALUES (?1, 1, ?2, ?3)
             ON CONFLICT(pattern) DO UPDATE SET
                active = 1,
                reason = COALESCE(excluded.reason, insider_exclusions.reason)",
            params![pattern, reason, chrono::Utc::now().timestamp()],
        )?;

        log::info!("🚫 Exclusion pattern active: '{}'", pattern);
        Ok(())
    }

    /// Returns false when no such pattern exists
    pub fn deactivate(&self, pattern: &str) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE insider_exclusions SET active = 0 WHERE pattern = ?1",
            [pattern.trim()],
        )?;
        Ok(updated > 0)
    }

    pub fn list(&self) -> Result<Vec<ExclusionEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, pattern, active, reason, created_at
             FROM insider_exclusions
             ORDER BY pattern",
        )?;

        let entries = stmt
            .query_map([], |row| {
                Ok(ExclusionEntry {
                    id: row.get(0)?,
                    pattern: row.get(1)?,
                    active: row.get(2)?,
                    reason: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    pub fn active_patterns(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT pattern FROM insider_exclusions WHERE active ORDER BY pattern",
        )?;

        let patterns = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(patterns)
    }

    /// Snapshot of the active patterns for in-memory matching
    pub fn matcher(&self) -> Result<ExclusionMatcher> {
        Ok(ExclusionMatcher::new(self.active_patterns()?))
    }
}

/// Case-insensitive substring matcher over a fixed set of patterns
#[derive(Debug, Clone, Default)]
pub struct ExclusionMatcher {
    patterns: Vec<String>,
}

impl ExclusionMatcher {
    /// Blank patterns are ignored rather than matching every name
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    pub fn is_excluded(&self, insider_name: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let name = insider_name.to_lowercase();
        self.patterns.iter().any(|p| name.contains(p.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_matcher_case_insensitive_substring() {
        let matcher = ExclusionMatcher::new(["vanguard", "BlackRock "]);
        assert!(matcher.is_excluded("VANGUARD GROUP INC"));
        assert!(matcher.is_excluded("The Vanguard Fund"));
        assert!(matcher.is_excluded("BLACKROCK INC."));
        assert!(!matcher.is_excluded("SMITH JOHN"));
        assert_eq!(matcher.len(), 2);
    }

    #[test]
    fn test_blank_patterns_ignored() {
        let matcher = ExclusionMatcher::new(["", "   "]);
        assert!(matcher.is_empty());
        assert!(!matcher.is_excluded("ANYONE"));
    }

    #[test]
    fn test_add_deactivate_reactivate() {
        let db = Database::open_in_memory().unwrap();
        db.init_schema().unwrap();
        let list = db.exclusions();

        list.add_pattern("Vanguard", Some("index fund")).unwrap();
        list.add_pattern("BlackRock", None).unwrap();
        assert_eq!(list.active_patterns().unwrap(), vec!["BlackRock", "Vanguard"]);

        assert!(list.deactivate("Vanguard").unwrap());
        assert!(!list.deactivate("missing").unwrap());
        assert_eq!(list.active_patterns().unwrap(), vec!["BlackRock"]);
        assert!(!list.matcher().unwrap().is_excluded("VANGUARD GROUP INC"));

        // Re-adding keeps the earlier reason and flips the row back on
        list.add_pattern("Vanguard", None).unwrap();
        let entries = list.list().unwrap();
        assert_eq!(entries.len(), 2);
        let vanguard = entries.iter().find(|e| e.pattern == "Vanguard").unwrap();
        assert!(vanguard.active);
        assert_eq!(vanguard.reason.as_deref(), Some("index fund"));
        assert!(list.matcher().unwrap().is_excluded("VANGUARD GROUP INC"));
    }

    #[test]
    fn test_blank_pattern_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.init_schema().unwrap();

        let result = db.exclusions().add_pattern("  ", None);
        assert!(matches!(result, Err(InsiderError::InvalidInput(_))));
    }
}
