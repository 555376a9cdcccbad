//! Append-only, batch-idempotent writer for `insider_buy_signals`
//!
//! Each source batch (a quarter file, a JSONL drop, ...) is recorded in
//! `ingested_batches` in the same transaction as its rows, so a batch is
//! either fully loaded exactly once or not at all.

use super::normalizer::{is_buy_code, Transaction};
use crate::error::{InsiderError, Result};
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The batch id was already recorded; nothing was written
    AlreadyLoaded,
    /// Rows written, plus rows dropped for a non-buy transaction code
    Loaded { inserted: usize, skipped: usize },
}

pub struct SignalWriter<'c> {
    conn: &'c Connection,
}

impl<'c> SignalWriter<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn is_batch_loaded(&self, batch_id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM ingested_batches WHERE batch_id = ?1",
                [batch_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Batch ids already ingested, oldest first
    pub fn loaded_batches(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT batch_id FROM ingested_batches ORDER BY loaded_at, batch_id")?;
        let batches = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(batches)
    }

    /// Insert the buy-coded rows of one batch and record the batch id
    pub fn ingest_batch(&self, batch_id: &str, rows: &[Transaction]) -> Result<IngestOutcome> {
        let batch_id = batch_id.trim();
        if batch_id.is_empty() {
            return Err(InsiderError::InvalidInput(
                "batch_id must not be blank".to_string(),
            ));
        }

        if self.is_batch_loaded(batch_id)? {
            log::info!("⏭️  Batch '{}' already loaded, skipping", batch_id);
            return Ok(IngestOutcome::AlreadyLoaded);
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0usize;
        let mut skipped = 0usize;

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO insider_buy_signals (
                    batch_id, ticker, issuer_id, insider_id, insider_name,
                    insider_relationship, insider_title, transaction_date,
                    filing_date, transaction_code, shares, total_value
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;

            for row in rows {
                if !is_buy_code(&row.transaction_code) {
                    skipped += 1;
                    continue;
                }

                let ticker = Some(row.ticker.trim()).filter(|t| !t.is_empty());
                stmt.execute(params![
                    batch_id,
                    ticker,
                    row.issuer_id.trim(),
                    row.insider_id.as_deref(),
                    row.insider_name.trim(),
                    row.insider_relationship.trim(),
                    row.insider_title.trim(),
                    row.transaction_date,
                    row.filing_date,
                    row.transaction_code.trim().to_uppercase(),
                    row.shares,
                    row.total_value,
                ])?;
                inserted += 1;
            }
        }

        tx.execute(
            "INSERT INTO ingested_batches (batch_id, row_count, loaded_at) VALUES (?1, ?2, ?3)",
            params![batch_id, inserted as i64, chrono::Utc::now().timestamp()],
        )?;
        tx.commit()?;

        log::info!(
            "✅ Loaded batch '{}': {} buy rows ({} non-buy skipped)",
            batch_id,
            inserted,
            skipped
        );
        Ok(IngestOutcome::Loaded { inserted, skipped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::insider_core::sqlite_reader::{SignalSource, TransactionScope};
    use chrono::NaiveDate;

    fn row(ticker: &str, name: &str, code: &str, day: u32) -> Transaction {
        Transaction {
            ticker: ticker.to_string(),
            issuer_id: "0000320193".to_string(),
            insider_id: Some("0001214156".to_string()),
            insider_name: name.to_string(),
            insider_relationship: "Director".to_string(),
            insider_title: String::new(),
            transaction_date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            filing_date: NaiveDate::from_ymd_opt(2024, 5, day + 2),
            transaction_code: code.to_string(),
            shares: 100.0,
            total_value: 2_500.0,
        }
    }

    fn signal_count(db: &Database) -> i64 {
        db.signals().count().unwrap()
    }

    #[test]
    fn test_ingest_filters_non_buys() {
        let db = Database::open_in_memory().unwrap();
        db.init_schema().unwrap();

        let rows = vec![
            row("ZETA", "ALPHA ANN", "P", 1),
            row("ZETA", "BETA BOB", "S", 2),
            row("ZETA", "GAMMA GUS", "m", 3),
            row("ZETA", "DELTA DEE", "A", 4),
        ];
        let outcome = db.writer().ingest_batch("2024q2", &rows).unwrap();

        assert_eq!(outcome, IngestOutcome::Loaded { inserted: 2, skipped: 2 });
        assert_eq!(signal_count(&db), 2);
    }

    #[test]
    fn test_batch_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.init_schema().unwrap();
        let writer = db.writer();
        let rows = vec![row("ZETA", "ALPHA ANN", "P", 1)];

        assert!(!writer.is_batch_loaded("2024q2").unwrap());
        writer.ingest_batch("2024q2", &rows).unwrap();
        assert!(writer.is_batch_loaded("2024q2").unwrap());

        let again = writer.ingest_batch("2024q2", &rows).unwrap();
        assert_eq!(again, IngestOutcome::AlreadyLoaded);
        assert_eq!(signal_count(&db), 1);

        writer.ingest_batch("2024q3", &rows).unwrap();
        assert_eq!(signal_count(&db), 2);
        assert_eq!(writer.loaded_batches().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_batch_is_still_recorded() {
        let db = Database::open_in_memory().unwrap();
        db.init_schema().unwrap();
        let writer = db.writer();

        let outcome = writer.ingest_batch("empty", &[]).unwrap();
        assert_eq!(outcome, IngestOutcome::Loaded { inserted: 0, skipped: 0 });
        assert!(writer.is_batch_loaded("empty").unwrap());
    }

    #[test]
    fn test_blank_ticker_stored_as_null() {
        let db = Database::open_in_memory().unwrap();
        db.init_schema().unwrap();

        db.writer()
            .ingest_batch("b1", &[row("  ", "ALPHA ANN", "P", 1), row("ZETA", "BETA BOB", "P", 1)])
            .unwrap();

        let nulls: i64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM insider_buy_signals WHERE ticker IS NULL",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(nulls, 1);

        // Null-ticker rows never reach detection
        let store = db.signals();
        let latest = store.latest_transaction_date().unwrap();
        let trades = store
            .load_transactions(&TransactionScope::lookback(latest, 30))
            .unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].insider_name, "BETA BOB");
        assert_eq!(trades[0].insider_id.as_deref(), Some("0001214156"));
        assert_eq!(trades[0].filing_date, NaiveDate::from_ymd_opt(2024, 5, 3));
    }

    #[test]
    fn test_blank_batch_id_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.init_schema().unwrap();

        let result = db.writer().ingest_batch(" ", &[]);
        assert!(matches!(result, Err(InsiderError::InvalidInput(_))));
    }
}
