//! SQLite-backed source of qualifying buy transactions
//!
//! Rows come from `insider_buy_signals`. Date, ticker and sentinel filters run
//! in SQL; the per-trade value floor is applied after numeric defaulting so
//! malformed values behave like zero.

use super::exclusions::{ExclusionList, ExclusionMatcher};
use super::normalizer::{finite_or_zero, parse_lenient_f64, Transaction, NO_TICKER};
use super::window::DateInterval;
use crate::error::{InsiderError, Result};
use chrono::{Days, NaiveDate};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Row};

/// Which transactions a detection run may look at
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionScope {
    pub dates: DateInterval,
    /// Restrict to one ticker (case-insensitive)
    pub ticker: Option<String>,
    /// Per-trade value floor, ignored when not positive
    pub min_trade_value: f64,
}

impl TransactionScope {
    /// `[latest - lookback_days, latest]`
    pub fn lookback(latest: NaiveDate, lookback_days: u32) -> Self {
        let start = latest
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .unwrap_or(NaiveDate::MIN);
        Self {
            dates: DateInterval::new(start, latest),
            ticker: None,
            min_trade_value: 0.0,
        }
    }

    pub fn with_ticker(mut self, ticker: Option<&str>) -> Self {
        self.ticker = ticker
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_uppercase);
        self
    }

    pub fn with_min_trade_value(mut self, min_trade_value: f64) -> Self {
        self.min_trade_value = min_trade_value;
        self
    }

    /// Whether a single transaction qualifies under this scope
    pub fn admits(&self, trade: &Transaction) -> bool {
        if !trade.has_usable_ticker() || !self.dates.contains(trade.transaction_date) {
            return false;
        }
        if let Some(ticker) = &self.ticker {
            if !trade.ticker.trim().eq_ignore_ascii_case(ticker) {
                return false;
            }
        }
        self.min_trade_value <= 0.0 || trade.total_value >= self.min_trade_value
    }
}

/// Read access to the buy-signal store
pub trait SignalSource {
    /// Latest transaction date over the whole store. An empty store is a
    /// precondition failure (`InsiderError::NoData`).
    fn latest_transaction_date(&self) -> Result<NaiveDate>;

    /// Qualifying transactions ordered by ticker, date and insertion order
    fn load_transactions(&self, scope: &TransactionScope) -> Result<Vec<Transaction>>;

    /// Matcher over the currently active exclusion patterns
    fn active_exclusions(&self) -> Result<ExclusionMatcher>;
}

pub struct SqliteSignalStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteSignalStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM insider_buy_signals", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// NULL text columns read as empty strings
fn text_or_blank(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

/// Numeric column with malformed or missing values defaulted to zero
fn numeric_or_zero(value: ValueRef<'_>) -> f64 {
    match value {
        ValueRef::Integer(i) => i as f64,
        ValueRef::Real(f) => finite_or_zero(f),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).map_or(0.0, parse_lenient_f64),
        ValueRef::Null | ValueRef::Blob(_) => 0.0,
    }
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        ticker: text_or_blank(row, 0)?,
        issuer_id: text_or_blank(row, 1)?,
        insider_id: row
            .get::<_, Option<String>>(2)?
            .filter(|id| !id.trim().is_empty()),
        insider_name: text_or_blank(row, 3)?,
        insider_relationship: text_or_blank(row, 4)?,
        insider_title: text_or_blank(row, 5)?,
        transaction_date: row.get(6)?,
        filing_date: row.get(7)?,
        transaction_code: text_or_blank(row, 8)?,
        shares: numeric_or_zero(row.get_ref(9)?),
        total_value: numeric_or_zero(row.get_ref(10)?),
    })
}

impl<'c> SignalSource for SqliteSignalStore<'c> {
    fn latest_transaction_date(&self) -> Result<NaiveDate> {
        let latest: Option<NaiveDate> = self.conn.query_row(
            "SELECT MAX(transaction_date) FROM insider_buy_signals",
            [],
            |row| row.get(0),
        )?;

        latest.ok_or_else(|| {
            InsiderError::NoData("insider_buy_signals is empty; no latest date to anchor".to_string())
        })
    }

    fn load_transactions(&self, scope: &TransactionScope) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT ticker, issuer_id, insider_id, insider_name, insider_relationship,
                    insider_title, transaction_date, filing_date, transaction_code,
                    shares, total_value
             FROM insider_buy_signals
             WHERE transaction_date BETWEEN ?1 AND ?2
               AND ticker IS NOT NULL
               AND TRIM(ticker) <> ''
               AND TRIM(ticker) <> ?3
               AND (?4 IS NULL OR UPPER(TRIM(ticker)) = ?4)
             ORDER BY ticker ASC, transaction_date ASC, id ASC",
        )?;

        let rows = stmt.query_map(
            params![scope.dates.start, scope.dates.end, NO_TICKER, scope.ticker],
            transaction_from_row,
        )?;

        let mut trades = Vec::new();
        for row in rows {
            let trade = row?;
            if scope.admits(&trade) {
                trades.push(trade);
            }
        }

        log::debug!(
            "📥 Loaded {} qualifying transactions for {}..={}",
            trades.len(),
            scope.dates.start,
            scope.dates.end
        );
        Ok(trades)
    }

    fn active_exclusions(&self) -> Result<ExclusionMatcher> {
        ExclusionList::new(self.conn).matcher()
    }
}
