//! Cluster-buy detection over the buy-signal store
//!
//! A run goes scope → raw windows → threshold filter → dedup → interval
//! union per ticker → recomputation per merged interval → score → post
//! filters → rank. Merged-interval stats are always rebuilt from the
//! transactions inside the interval, never summed from raw windows.

use super::entity_store::EntityResolver;
use super::normalizer::{first_nonempty, format_insider_label, InsiderFlags, Transaction};
use super::roles::{compute_role_weight, KeyRole, KEY_OFFICER_WEIGHT};
use super::scorer::ClusterScorer;
use super::sqlite_reader::{SignalSource, TransactionScope};
use super::window::{
    compute_raw_windows, dedupe_windows, filter_raw_windows, group_by_ticker,
    merge_windows_by_ticker, DateInterval,
};
use crate::error::{InsiderError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Parameters of one detection run
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterQuery {
    pub window_days: u32,
    pub lookback_days: u32,
    /// Applied to raw windows (distinct insiders) and to merged events (people)
    pub min_insiders: usize,
    pub min_total_value: f64,
    pub min_trade_value: f64,
    pub ticker: Option<String>,
    pub use_exclusions: bool,
    pub min_role_score: u32,
    pub min_people: Option<usize>,
    pub max_fund_ratio: Option<f64>,
    pub min_cluster_score: Option<f64>,
    /// Top-N cut after ranking; `None` returns every event
    pub limit: Option<usize>,
}

impl Default for ClusterQuery {
    fn default() -> Self {
        Self {
            window_days: 10,
            lookback_days: 90,
            min_insiders: 2,
            min_total_value: 0.0,
            min_trade_value: 0.0,
            ticker: None,
            use_exclusions: true,
            min_role_score: 0,
            min_people: None,
            max_fund_ratio: None,
            min_cluster_score: None,
            limit: None,
        }
    }
}

impl ClusterQuery {
    pub fn with_window_days(mut self, window_days: u32) -> Self {
        self.window_days = window_days;
        self
    }

    pub fn with_lookback_days(mut self, lookback_days: u32) -> Self {
        self.lookback_days = lookback_days;
        self
    }

    pub fn with_min_insiders(mut self, min_insiders: usize) -> Self {
        self.min_insiders = min_insiders;
        self
    }

    pub fn with_min_total_value(mut self, min_total_value: f64) -> Self {
        self.min_total_value = min_total_value;
        self
    }

    pub fn with_min_trade_value(mut self, min_trade_value: f64) -> Self {
        self.min_trade_value = min_trade_value;
        self
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_exclusions(mut self, use_exclusions: bool) -> Self {
        self.use_exclusions = use_exclusions;
        self
    }

    pub fn with_min_role_score(mut self, min_role_score: u32) -> Self {
        self.min_role_score = min_role_score;
        self
    }

    pub fn with_min_people(mut self, min_people: usize) -> Self {
        self.min_people = Some(min_people);
        self
    }

    pub fn with_max_fund_ratio(mut self, max_fund_ratio: f64) -> Self {
        self.max_fund_ratio = Some(max_fund_ratio);
        self
    }

    pub fn with_min_cluster_score(mut self, min_cluster_score: f64) -> Self {
        self.min_cluster_score = Some(min_cluster_score);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.window_days == 0 {
            return Err(InsiderError::InvalidInput(
                "window_days must be at least 1".to_string(),
            ));
        }
        if let Some(ratio) = self.max_fund_ratio {
            if ratio.is_nan() {
                return Err(InsiderError::InvalidInput(
                    "max_fund_ratio must be a number".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// One merged cluster-buy interval with stats rebuilt from its transactions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedClusterEvent {
    pub ticker: String,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub num_trades: usize,
    /// Distinct non-fund people
    pub num_insiders: usize,
    pub num_total_insiders: usize,
    pub num_fund_like: usize,
    pub total_shares: f64,
    pub total_value: f64,
    /// People labels, highest summed value first
    pub top_insiders: Vec<String>,
    pub fund_like_insiders: Vec<String>,
    pub role_score: u32,
    pub num_key_officers: usize,
    pub has_cfo: bool,
    pub has_gc: bool,
    pub has_ceo: bool,
    pub key_roles: Vec<KeyRole>,
    pub cluster_score: f64,
}

impl MergedClusterEvent {
    pub fn interval(&self) -> DateInterval {
        DateInterval::new(self.window_start, self.window_end)
    }

    /// Fund share of all distinct insiders, floored denominator of 1
    pub fn fund_ratio(&self) -> f64 {
        self.num_fund_like as f64 / self.num_total_insiders.max(1) as f64
    }
}

/// Rows of one insider (by normalized name) inside a merged interval
struct InsiderRows<'a> {
    rows: Vec<&'a Transaction>,
    total_value: f64,
}

impl<'a> InsiderRows<'a> {
    fn display_name(&self, normalized: &'a str) -> &'a str {
        let raw = first_nonempty(self.rows.iter().map(|t| t.insider_name.as_str()));
        if raw.is_empty() {
            normalized
        } else {
            raw
        }
    }

    fn relationship(&self) -> &'a str {
        first_nonempty(self.rows.iter().map(|t| t.insider_relationship.as_str()))
    }

    fn title(&self) -> &'a str {
        first_nonempty(self.rows.iter().map(|t| t.insider_title.as_str()))
    }

    fn flags(&self) -> InsiderFlags {
        self.rows
            .iter()
            .fold(InsiderFlags::default(), |acc, t| acc.merge(t.flags()))
    }

    fn insider_id(&self) -> Option<&'a str> {
        self.rows.iter().find_map(|t| t.insider_id.as_deref())
    }
}

/// Descending by value; stable, so equal values keep name order
fn sort_labels_by_value(labels: &mut [(f64, String)]) {
    labels.sort_by(|a, b| b.0.total_cmp(&a.0));
}

/// Ranking order: score, role score, people, value (all desc), then funds asc.
/// Ticker and start date make the order total.
fn rank_events(a: &MergedClusterEvent, b: &MergedClusterEvent) -> Ordering {
    b.cluster_score
        .total_cmp(&a.cluster_score)
        .then_with(|| b.role_score.cmp(&a.role_score))
        .then_with(|| b.num_insiders.cmp(&a.num_insiders))
        .then_with(|| b.total_value.total_cmp(&a.total_value))
        .then_with(|| a.num_fund_like.cmp(&b.num_fund_like))
        .then_with(|| a.ticker.cmp(&b.ticker))
        .then_with(|| a.window_start.cmp(&b.window_start))
}

pub struct ClusterDetector<S, R> {
    source: S,
    resolver: R,
    scorer: ClusterScorer,
}

impl<S: SignalSource, R: EntityResolver> ClusterDetector<S, R> {
    pub fn new(source: S, resolver: R) -> Self {
        Self {
            source,
            resolver,
            scorer: ClusterScorer::new(),
        }
    }

    pub fn with_scorer(mut self, scorer: ClusterScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Ranked merged cluster-buy events for `query`.
    ///
    /// An empty signal store fails with `InsiderError::NoData`; every other
    /// "nothing found" outcome is an empty vector.
    pub fn find_cluster_buys(&self, query: &ClusterQuery) -> Result<Vec<MergedClusterEvent>> {
        query.validate()?;

        let pool = self.load_pool(query)?;
        if pool.is_empty() {
            log::debug!("🔍 No qualifying transactions in scope");
            return Ok(Vec::new());
        }

        let raw = compute_raw_windows(&pool, query.window_days);
        let raw_count = raw.len();
        let kept = filter_raw_windows(raw, query.min_insiders, query.min_total_value);
        let unique = dedupe_windows(kept);
        log::debug!(
            "🪟 {} raw windows, {} after thresholds and dedup",
            raw_count,
            unique.len()
        );
        if unique.is_empty() {
            return Ok(Vec::new());
        }

        let merged = merge_windows_by_ticker(&unique);
        let by_ticker = group_by_ticker(&pool);
        let mut fund_cache: HashMap<String, bool> = HashMap::new();
        let mut events = Vec::new();

        for (ticker, intervals) in &merged {
            let Some(trades) = by_ticker.get(ticker.as_str()) else {
                continue;
            };
            for interval in intervals {
                let lo = trades.partition_point(|t| t.transaction_date < interval.start);
                let hi = trades.partition_point(|t| t.transaction_date <= interval.end);
                if lo >= hi {
                    continue;
                }
                let event = self.summarize_interval(ticker, *interval, &trades[lo..hi], &mut fund_cache)?;
                if self.passes_post_filters(&event, query) {
                    events.push(event);
                }
            }
        }

        events.sort_by(rank_events);
        if let Some(limit) = query.limit {
            events.truncate(limit);
        }

        log::debug!(
            "📊 {} merged intervals across {} tickers, {} events returned",
            merged.values().map(Vec::len).sum::<usize>(),
            merged.len(),
            events.len()
        );
        Ok(events)
    }

    /// Qualifying transactions in the lookback scope, exclusions applied
    fn load_pool(&self, query: &ClusterQuery) -> Result<Vec<Transaction>> {
        let latest = self.source.latest_transaction_date()?;
        let scope = TransactionScope::lookback(latest, query.lookback_days)
            .with_ticker(query.ticker.as_deref())
            .with_min_trade_value(query.min_trade_value);

        let mut pool = self.source.load_transactions(&scope)?;

        if query.use_exclusions {
            let matcher = self.source.active_exclusions()?;
            if !matcher.is_empty() {
                let before = pool.len();
                pool.retain(|t| !matcher.is_excluded(&t.insider_name));
                log::debug!(
                    "🚫 Exclusions removed {} of {} transactions",
                    before - pool.len(),
                    before
                );
            }
        }

        Ok(pool)
    }

    fn is_fund_like(
        &self,
        normalized: &str,
        insider: &InsiderRows<'_>,
        cache: &mut HashMap<String, bool>,
    ) -> Result<bool> {
        // Unnamed rows cannot be classified and count as people
        if normalized.is_empty() {
            return Ok(false);
        }
        if let Some(&fund_like) = cache.get(normalized) {
            return Ok(fund_like);
        }

        let entity = self.resolver.get_or_create(
            insider.display_name(normalized),
            insider.title(),
            &insider.flags(),
            insider.insider_id(),
        )?;
        cache.insert(normalized.to_string(), entity.is_fund_like);
        Ok(entity.is_fund_like)
    }

    fn summarize_interval(
        &self,
        ticker: &str,
        interval: DateInterval,
        trades: &[&Transaction],
        fund_cache: &mut HashMap<String, bool>,
    ) -> Result<MergedClusterEvent> {
        let mut insiders: BTreeMap<String, InsiderRows<'_>> = BTreeMap::new();
        let mut total_shares = 0.0;
        let mut total_value = 0.0;

        for trade in trades {
            total_shares += trade.shares;
            total_value += trade.total_value;
            let entry = insiders
                .entry(trade.normalized_name())
                .or_insert_with(|| InsiderRows {
                    rows: Vec::new(),
                    total_value: 0.0,
                });
            entry.rows.push(*trade);
            entry.total_value += trade.total_value;
        }

        let mut people: Vec<(f64, String)> = Vec::new();
        let mut funds: Vec<(f64, String)> = Vec::new();
        let mut role_score = 0u32;
        let mut num_key_officers = 0usize;
        let mut key_roles: Vec<KeyRole> = Vec::new();

        for (normalized, insider) in &insiders {
            let title = insider.title();
            let label = format_insider_label(
                insider.display_name(normalized),
                insider.relationship(),
                title,
            );

            if self.is_fund_like(normalized, insider, fund_cache)? {
                funds.push((insider.total_value, label));
                continue;
            }

            let flags = insider.flags();
            let weight = compute_role_weight(title, flags.is_director, flags.is_officer);
            role_score += weight;
            if weight >= KEY_OFFICER_WEIGHT {
                num_key_officers += 1;
            }
            for role in KeyRole::all() {
                if role.matches(title) && !key_roles.contains(&role) {
                    key_roles.push(role);
                }
            }
            people.push((insider.total_value, label));
        }

        sort_labels_by_value(&mut people);
        sort_labels_by_value(&mut funds);
        key_roles.sort();

        let num_insiders = people.len();
        let num_fund_like = funds.len();
        let num_total_insiders = insiders.len();
        let cluster_score = self.scorer.score(
            num_insiders,
            role_score,
            total_value,
            num_fund_like,
            num_total_insiders,
        );

        Ok(MergedClusterEvent {
            ticker: ticker.to_string(),
            window_start: interval.start,
            window_end: interval.end,
            num_trades: trades.len(),
            num_insiders,
            num_total_insiders,
            num_fund_like,
            total_shares,
            total_value,
            top_insiders: people.into_iter().map(|(_, label)| label).collect(),
            fund_like_insiders: funds.into_iter().map(|(_, label)| label).collect(),
            role_score,
            num_key_officers,
            has_cfo: key_roles.contains(&KeyRole::Cfo),
            has_gc: key_roles.contains(&KeyRole::Gc),
            has_ceo: key_roles.contains(&KeyRole::Ceo),
            key_roles,
            cluster_score,
        })
    }

    fn passes_post_filters(&self, event: &MergedClusterEvent, query: &ClusterQuery) -> bool {
        if event.num_insiders < query.min_insiders {
            return false;
        }
        if let Some(min_people) = query.min_people {
            if event.num_insiders < min_people {
                return false;
            }
        }
        if event.role_score < query.min_role_score {
            return false;
        }
        if let Some(min_score) = query.min_cluster_score {
            if event.cluster_score < min_score {
                return false;
            }
        }
        if let Some(max_ratio) = query.max_fund_ratio {
            if event.fund_ratio() > max_ratio {
                return false;
            }
        }
        true
    }
}
