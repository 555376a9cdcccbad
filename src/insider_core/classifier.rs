//! Insider entity classification: cheap name rules first, then a fallback
//! policy for anything the rules are not confident about.
//!
//! The fallback is a trait so the deterministic stub can be swapped for a
//! model-backed classifier without touching the cache or the detector.

use super::normalizer::{normalize_insider_name, InsiderFlags};
use serde::{Deserialize, Serialize};

/// Legal-entity / fund markers searched for in the normalized name.
///
/// The leading space means a token only matches after a preceding word, so
/// a name that merely starts with "TRUST" or "CAPITAL" stays a person.
pub const FUND_TOKENS: [&str; 24] = [
    " L.P",
    " LP",
    " LLP",
    " L.L.P",
    " LLC",
    " L.L.C",
    " CORP",
    " CORPORATION",
    " INC",
    " INC.",
    " LIMITED",
    " LTD",
    " PLC",
    " FUND",
    " CAPITAL",
    " PARTNERS",
    " ADVISORS",
    " INVESTMENT",
    " INVESTORS",
    " ASSET MANAGEMENT",
    " MANAGEMENT LP",
    " HOLDINGS",
    " TRUST",
    " FOUNDATION",
];

/// Results below this confidence are escalated to the fallback classifier
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.8;
pub const RULE_CONFIDENCE_FUND: f64 = 0.8;
pub const RULE_CONFIDENCE_PERSON: f64 = 0.6;
pub const RULE_CONFIDENCE_FLAGGED_PERSON: f64 = 0.7;
pub const STUB_AI_MIN_CONFIDENCE: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    FundOrInvestmentVehicle,
    OperatingCompany,
    TrustOrFoundation,
    Other,
    Unknown,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "person",
            EntityType::FundOrInvestmentVehicle => "fund_or_investment_vehicle",
            EntityType::OperatingCompany => "operating_company",
            EntityType::TrustOrFoundation => "trust_or_foundation",
            EntityType::Other => "other",
            EntityType::Unknown => "unknown",
        }
    }

    /// Unrecognized stored values map to `Unknown`
    pub fn parse_stored(s: &str) -> Self {
        match s {
            "person" => EntityType::Person,
            "fund_or_investment_vehicle" => EntityType::FundOrInvestmentVehicle,
            "operating_company" => EntityType::OperatingCompany,
            "trust_or_foundation" => EntityType::TrustOrFoundation,
            "other" => EntityType::Other,
            _ => EntityType::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Rules,
    Ai,
}

impl ClassificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationSource::Rules => "rules",
            ClassificationSource::Ai => "ai",
        }
    }

    pub fn parse_stored(s: &str) -> Self {
        match s {
            "ai" => ClassificationSource::Ai,
            _ => ClassificationSource::Rules,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub entity_type: EntityType,
    pub is_fund_like: bool,
    pub confidence: f64,
    pub source: ClassificationSource,
    pub rationale: String,
}

/// Second-stage classifier consulted when the rules are not confident
pub trait FallbackClassifier {
    /// Returns `None` when the fallback has no opinion; the rules result is kept.
    fn classify(
        &self,
        name: &str,
        title: &str,
        flags: &InsiderFlags,
        rules: &Classification,
    ) -> Option<Classification>;
}

/// Deterministic stand-in for a model call: echoes the rules verdict with
/// a confidence floor and `source = ai`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubAiClassifier;

impl FallbackClassifier for StubAiClassifier {
    fn classify(
        &self,
        _name: &str,
        _title: &str,
        _flags: &InsiderFlags,
        rules: &Classification,
    ) -> Option<Classification> {
        let rationale = if rules.rationale.is_empty() {
            "Stubbed AI classification reused rule-based result".to_string()
        } else {
            rules.rationale.clone()
        };

        Some(Classification {
            source: ClassificationSource::Ai,
            confidence: rules.confidence.max(STUB_AI_MIN_CONFIDENCE),
            rationale,
            ..rules.clone()
        })
    }
}

/// Rule-based pass using name and title heuristics only
pub fn classify_by_rules(name: &str, title: &str, flags: &InsiderFlags) -> Classification {
    let normalized = normalize_insider_name(name);

    let mut hits: Vec<&str> = FUND_TOKENS
        .iter()
        .filter(|token| normalized.contains(*token))
        .map(|token| token.trim())
        .collect();
    hits.sort_unstable();
    hits.dedup();

    if !hits.is_empty() {
        return Classification {
            entity_type: EntityType::FundOrInvestmentVehicle,
            is_fund_like: true,
            confidence: RULE_CONFIDENCE_FUND,
            source: ClassificationSource::Rules,
            rationale: format!("Matched fund token(s): {}", hits.join(", ")),
        };
    }

    let (confidence, rationale) = if flags.is_officer || flags.is_director {
        (RULE_CONFIDENCE_FLAGGED_PERSON, "Flagged as officer/director")
    } else if !title.trim().is_empty() {
        (RULE_CONFIDENCE_PERSON, "Officer title present")
    } else {
        (RULE_CONFIDENCE_PERSON, "Defaulted to person; no fund markers detected")
    };

    Classification {
        entity_type: EntityType::Person,
        is_fund_like: false,
        confidence,
        source: ClassificationSource::Rules,
        rationale: rationale.to_string(),
    }
}

/// Rules composed with a fallback policy
#[derive(Debug, Clone)]
pub struct InsiderClassifier<F = StubAiClassifier> {
    fallback: F,
    high_confidence_threshold: f64,
}

impl InsiderClassifier<StubAiClassifier> {
    pub fn new() -> Self {
        Self::with_fallback(StubAiClassifier)
    }
}

impl Default for InsiderClassifier<StubAiClassifier> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FallbackClassifier> InsiderClassifier<F> {
    pub fn with_fallback(fallback: F) -> Self {
        Self {
            fallback,
            high_confidence_threshold: HIGH_CONFIDENCE_THRESHOLD,
        }
    }

    pub fn classify(&self, name: &str, title: &str, flags: &InsiderFlags) -> Classification {
        let rules = classify_by_rules(name, title, flags);
        if rules.confidence >= self.high_confidence_threshold {
            return rules;
        }

        match self.fallback.classify(name, title, flags, &rules) {
            Some(escalated) => escalated,
            None => rules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn officer() -> InsiderFlags {
        InsiderFlags {
            is_officer: true,
            ..InsiderFlags::default()
        }
    }

    #[test]
    fn test_fund_tokens_match() {
        let result = classify_by_rules("Vanguard Group Inc", "", &InsiderFlags::default());
        assert_eq!(result.entity_type, EntityType::FundOrInvestmentVehicle);
        assert!(result.is_fund_like);
        assert_eq!(result.confidence, RULE_CONFIDENCE_FUND);
        assert_eq!(result.rationale, "Matched fund token(s): INC");

        let multi = classify_by_rules("BAKER BROS  CAPITAL   LLC", "", &InsiderFlags::default());
        assert_eq!(multi.rationale, "Matched fund token(s): CAPITAL, LLC");
    }

    #[test]
    fn test_token_needs_word_start() {
        // "PRINCE" contains "INC" but not " INC"
        let result = classify_by_rules("PRINCE JOHN", "", &InsiderFlags::default());
        assert!(!result.is_fund_like);
        assert_eq!(result.entity_type, EntityType::Person);
    }

    #[test]
    fn test_leading_token_is_not_fund() {
        for name in ["TRUST JOHN", "Capital Jane", "  FOUNDATION MEDICINE"] {
            let result = classify_by_rules(name, "", &InsiderFlags::default());
            assert!(!result.is_fund_like, "{}", name);
            assert_eq!(result.entity_type, EntityType::Person, "{}", name);
        }

        // The same words after a preceding word still count
        let trust = classify_by_rules("SMITH FAMILY TRUST", "", &InsiderFlags::default());
        assert!(trust.is_fund_like);
        assert_eq!(trust.rationale, "Matched fund token(s): TRUST");
    }

    #[test]
    fn test_person_confidence_bumped_by_flags() {
        let plain = classify_by_rules("SMITH JOHN", "", &InsiderFlags::default());
        assert_eq!(plain.confidence, RULE_CONFIDENCE_PERSON);

        let flagged = classify_by_rules("SMITH JOHN", "CFO", &officer());
        assert_eq!(flagged.confidence, RULE_CONFIDENCE_FLAGGED_PERSON);
        assert_eq!(flagged.rationale, "Flagged as officer/director");

        let titled = classify_by_rules("SMITH JOHN", "CFO", &InsiderFlags::default());
        assert_eq!(titled.rationale, "Officer title present");
    }

    #[test]
    fn test_fallback_used_below_threshold() {
        let classifier = InsiderClassifier::new();

        let person = classifier.classify("SMITH JOHN", "", &InsiderFlags::default());
        assert_eq!(person.source, ClassificationSource::Ai);
        assert_eq!(person.confidence, STUB_AI_MIN_CONFIDENCE);
        assert_eq!(person.entity_type, EntityType::Person);

        let fund = classifier.classify("ACME CAPITAL PARTNERS", "", &InsiderFlags::default());
        assert_eq!(fund.source, ClassificationSource::Rules);
        assert_eq!(fund.confidence, RULE_CONFIDENCE_FUND);
    }

    struct Abstain;

    impl FallbackClassifier for Abstain {
        fn classify(
            &self,
            _name: &str,
            _title: &str,
            _flags: &InsiderFlags,
            _rules: &Classification,
        ) -> Option<Classification> {
            None
        }
    }

    struct AlwaysTrust;

    impl FallbackClassifier for AlwaysTrust {
        fn classify(
            &self,
            _name: &str,
            _title: &str,
            _flags: &InsiderFlags,
            _rules: &Classification,
        ) -> Option<Classification> {
            Some(Classification {
                entity_type: EntityType::TrustOrFoundation,
                is_fund_like: true,
                confidence: 0.95,
                source: ClassificationSource::Ai,
                rationale: "model".to_string(),
            })
        }
    }

    #[test]
    fn test_swappable_fallback() {
        let abstain = InsiderClassifier::with_fallback(Abstain);
        let kept = abstain.classify("SMITH JOHN", "", &InsiderFlags::default());
        assert_eq!(kept.source, ClassificationSource::Rules);

        let trusting = InsiderClassifier::with_fallback(AlwaysTrust);
        let replaced = trusting.classify("SMITH FAMILY", "", &InsiderFlags::default());
        assert_eq!(replaced.entity_type, EntityType::TrustOrFoundation);
        assert!(replaced.is_fund_like);

        // Confident rules never reach the fallback
        let fund = trusting.classify("ACME LLC", "", &InsiderFlags::default());
        assert_eq!(fund.entity_type, EntityType::FundOrInvestmentVehicle);
    }

    #[test]
    fn test_entity_type_round_trip_strings() {
        assert_eq!(
            EntityType::parse_stored("fund_or_investment_vehicle"),
            EntityType::FundOrInvestmentVehicle
        );
        assert_eq!(EntityType::parse_stored("garbage"), EntityType::Unknown);
        assert_eq!(ClassificationSource::parse_stored("ai"), ClassificationSource::Ai);
        assert_eq!(ClassificationSource::parse_stored("rules"), ClassificationSource::Rules);
        for entity_type in [EntityType::Person, EntityType::TrustOrFoundation, EntityType::Other] {
            assert_eq!(EntityType::parse_stored(entity_type.as_str()), entity_type);
        }
    }
}
