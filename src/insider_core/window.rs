//! Per-transaction lookback windows and their union into event intervals
//!
//! Every buy anchors a raw window `[date - (window_days - 1), date]` whose
//! stats cover all buys of the same ticker inside it. Raw windows that pass
//! the entry thresholds are de-duplicated and merged per ticker with the
//! classic interval-union sweep.

use super::normalizer::{format_insider_label, Transaction};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Closed date interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateInterval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Lookback window ending on `date`, `window_days` long (inclusive)
pub fn window_bounds(date: NaiveDate, window_days: u32) -> DateInterval {
    let back = u64::from(window_days.saturating_sub(1));
    let start = date.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN);
    DateInterval::new(start, date)
}

/// Stats for one ticker over one raw window
#[derive(Debug, Clone, PartialEq)]
pub struct RawWindow {
    pub ticker: String,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    /// Date of the transaction that produced this window
    pub anchor_date: NaiveDate,
    pub num_trades: usize,
    pub num_insiders: usize,
    pub total_shares: f64,
    pub total_value: f64,
    /// Insider labels ranked by summed value in the window
    pub top_insiders: Vec<String>,
}

impl RawWindow {
    pub fn interval(&self) -> DateInterval {
        DateInterval::new(self.window_start, self.window_end)
    }
}

#[derive(Debug, Default)]
struct InsiderTally<'a> {
    total_value: f64,
    relationship: Option<&'a str>,
    title: Option<&'a str>,
}

impl<'a> InsiderTally<'a> {
    fn add_trade(&mut self, trade: &'a Transaction) {
        self.total_value += trade.total_value;
        self.relationship = min_nonblank(self.relationship, &trade.insider_relationship);
        self.title = min_nonblank(self.title, &trade.insider_title);
    }
}

/// Lexicographic minimum ignoring blanks
fn min_nonblank<'a>(current: Option<&'a str>, candidate: &'a str) -> Option<&'a str> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return current;
    }
    match current {
        Some(existing) if existing <= candidate => Some(existing),
        _ => Some(candidate),
    }
}

/// Accumulates one raw window's stats from its trades
#[derive(Debug, Default)]
struct WindowStats<'a> {
    num_trades: usize,
    total_shares: f64,
    total_value: f64,
    insiders: BTreeMap<&'a str, InsiderTally<'a>>,
}

impl<'a> WindowStats<'a> {
    fn add_trade(&mut self, trade: &'a Transaction) {
        self.num_trades += 1;
        self.total_shares += trade.shares;
        self.total_value += trade.total_value;
        self.insiders
            .entry(trade.insider_name.as_str())
            .or_default()
            .add_trade(trade);
    }

    fn into_window(self, ticker: &str, bounds: DateInterval, anchor_date: NaiveDate) -> RawWindow {
        let num_insiders = self.insiders.len();

        // BTreeMap order breaks value ties by name
        let mut ranked: Vec<(&str, InsiderTally<'_>)> = self.insiders.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_value.total_cmp(&a.1.total_value));

        let top_insiders = ranked
            .iter()
            .map(|(name, tally)| {
                format_insider_label(
                    name,
                    tally.relationship.unwrap_or(""),
                    tally.title.unwrap_or(""),
                )
            })
            .collect();

        RawWindow {
            ticker: ticker.to_string(),
            window_start: bounds.start,
            window_end: bounds.end,
            anchor_date,
            num_trades: self.num_trades,
            num_insiders,
            total_shares: self.total_shares,
            total_value: self.total_value,
            top_insiders,
        }
    }
}

/// Group the pool by ticker, each group sorted by transaction date.
///
/// The sort is stable, so same-day trades keep pool order.
pub fn group_by_ticker(pool: &[Transaction]) -> BTreeMap<&str, Vec<&Transaction>> {
    let mut groups: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for trade in pool {
        groups.entry(trade.ticker.as_str()).or_default().push(trade);
    }
    for trades in groups.values_mut() {
        trades.sort_by_key(|t| t.transaction_date);
    }
    groups
}

/// One raw window per transaction, with stats over every same-ticker trade
/// inside `[date - (window_days - 1), date]`.
pub fn compute_raw_windows(pool: &[Transaction], window_days: u32) -> Vec<RawWindow> {
    let mut windows = Vec::with_capacity(pool.len());

    for (ticker, trades) in group_by_ticker(pool) {
        for trade in &trades {
            let bounds = window_bounds(trade.transaction_date, window_days);
            let lo = trades.partition_point(|t| t.transaction_date < bounds.start);
            let hi = trades.partition_point(|t| t.transaction_date <= bounds.end);

            let mut stats = WindowStats::default();
            for member in &trades[lo..hi] {
                stats.add_trade(*member);
            }
            windows.push(stats.into_window(ticker, bounds, trade.transaction_date));
        }
    }

    windows
}

/// Keep windows with enough distinct insiders and enough total value
pub fn filter_raw_windows(
    windows: Vec<RawWindow>,
    min_insiders: usize,
    min_total_value: f64,
) -> Vec<RawWindow> {
    windows
        .into_iter()
        .filter(|w| w.num_insiders >= min_insiders && w.total_value >= min_total_value)
        .collect()
}

/// Collapse windows sharing `(ticker, start, end)`, keeping the one with the
/// latest anchor date. Output is ordered by that key.
pub fn dedupe_windows(windows: Vec<RawWindow>) -> Vec<RawWindow> {
    let mut unique: BTreeMap<(String, NaiveDate, NaiveDate), RawWindow> = BTreeMap::new();

    for window in windows {
        let key = (window.ticker.clone(), window.window_start, window.window_end);
        let newer = unique
            .get(&key)
            .map_or(true, |kept| window.anchor_date > kept.anchor_date);
        if newer {
            unique.insert(key, window);
        }
    }

    unique.into_values().collect()
}

/// Union of intervals: sort by start, then fold each interval into the
/// running one when `start <= running.end` (touching counts as overlap).
pub fn merge_intervals<I>(intervals: I) -> Vec<DateInterval>
where
    I: IntoIterator<Item = DateInterval>,
{
    let mut sorted: Vec<DateInterval> = intervals.into_iter().collect();
    sorted.sort();

    let mut merged: Vec<DateInterval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        if let Some(last) = merged.last_mut() {
            if interval.start <= last.end {
                last.end = last.end.max(interval.end);
                continue;
            }
        }
        merged.push(interval);
    }

    merged
}

/// Merged intervals per ticker, tickers in ascending order
pub fn merge_windows_by_ticker(windows: &[RawWindow]) -> BTreeMap<String, Vec<DateInterval>> {
    let mut by_ticker: BTreeMap<String, Vec<DateInterval>> = BTreeMap::new();
    for window in windows {
        by_ticker
            .entry(window.ticker.clone())
            .or_default()
            .push(window.interval());
    }

    by_ticker
        .into_iter()
        .map(|(ticker, intervals)| (ticker, merge_intervals(intervals)))
        .collect()
}
