//! Transaction model and the string normalization shared by every stage

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Transaction codes treated as buys: open-market purchase and derivative conversion
pub const BUY_CODES: [&str; 2] = ["P", "M"];

/// Ticker value upstream uses when an issuer has no trading symbol
pub const NO_TICKER: &str = "NONE";

/// One buy-coded Form 3/4/5 transaction row
///
/// Optional fields never fail a load: null or malformed text reads as `""`,
/// numbers as `0.0` and filing dates as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub ticker: String,
    #[serde(default, deserialize_with = "blank_if_missing")]
    pub issuer_id: String,
    #[serde(default)]
    pub insider_id: Option<String>,
    pub insider_name: String,
    #[serde(default, deserialize_with = "blank_if_missing")]
    pub insider_relationship: String,
    #[serde(default, deserialize_with = "blank_if_missing")]
    pub insider_title: String,
    pub transaction_date: NaiveDate,
    #[serde(default, deserialize_with = "date_or_none")]
    pub filing_date: Option<NaiveDate>,
    pub transaction_code: String,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub shares: f64,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub total_value: f64,
}

/// Parse a numeric string; blanks, junk and non-finite values become zero
pub fn parse_lenient_f64(raw: &str) -> f64 {
    finite_or_zero(raw.trim().parse::<f64>().unwrap_or(0.0))
}

pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn number_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => finite_or_zero(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => parse_lenient_f64(&s),
        _ => 0.0,
    })
}

fn blank_if_missing<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn date_or_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
        _ => None,
    })
}

impl Transaction {
    pub fn normalized_name(&self) -> String {
        normalize_insider_name(&self.insider_name)
    }

    pub fn flags(&self) -> InsiderFlags {
        InsiderFlags::from_relationship(&self.insider_relationship)
    }

    /// Whether the row belongs in cluster detection at all
    pub fn has_usable_ticker(&self) -> bool {
        let ticker = self.ticker.trim();
        !ticker.is_empty() && ticker != NO_TICKER
    }
}

/// Relationship flags reported for an insider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsiderFlags {
    pub is_director: bool,
    pub is_officer: bool,
    pub is_ten_percent_owner: bool,
    pub is_other: bool,
}

impl InsiderFlags {
    /// Derive flags from the free-text relationship column
    pub fn from_relationship(relationship: &str) -> Self {
        let rel = relationship.to_lowercase();
        Self {
            is_director: rel.contains("director"),
            is_officer: rel.contains("officer"),
            is_ten_percent_owner: rel.contains("ten percent") || rel.contains("10%"),
            is_other: rel.contains("other"),
        }
    }

    /// Flag-wise OR, used when an insider reports several rows
    pub fn merge(self, other: InsiderFlags) -> Self {
        Self {
            is_director: self.is_director || other.is_director,
            is_officer: self.is_officer || other.is_officer,
            is_ten_percent_owner: self.is_ten_percent_owner || other.is_ten_percent_owner,
            is_other: self.is_other || other.is_other,
        }
    }
}

/// Upper-case and collapse whitespace so spelling variants share one key
pub fn normalize_insider_name(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_uppercase())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_buy_code(code: &str) -> bool {
    let code = code.trim();
    BUY_CODES.iter().any(|c| c.eq_ignore_ascii_case(code))
}

/// Display label: `NAME (descriptor)` built from relationship and title
pub fn format_insider_label(name: &str, relationship: &str, title: &str) -> String {
    let rel = relationship.trim();
    let role = title.trim();

    let descriptor = if rel.eq_ignore_ascii_case("officer") {
        if role.is_empty() {
            "Officer".to_string()
        } else {
            format!("Officer, {}", role)
        }
    } else if !rel.is_empty() && !role.is_empty() {
        format!("{}, {}", rel, role)
    } else if !rel.is_empty() {
        rel.to_string()
    } else {
        role.to_string()
    };

    if descriptor.is_empty() {
        name.to_string()
    } else {
        format!("{} ({})", name, descriptor)
    }
}

/// First value that is non-blank after trimming, or `""`
pub fn first_nonempty<'a, I>(values: I) -> &'a str
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or("")
}
