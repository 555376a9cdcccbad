//! Role weighting for insiders based on officer titles and flags

/// Title keywords and their weights, matched as substrings of the upper-cased
/// title. A title matching several keys takes the highest weight.
pub const ROLE_WEIGHTS: [(&str, u32); 21] = [
    ("CFO", 4),
    ("CHIEF FINANCIAL OFFICER", 4),
    ("GENERAL COUNSEL", 4),
    ("CHIEF LEGAL OFFICER", 4),
    ("COO", 3),
    ("CHIEF OPERATING OFFICER", 3),
    ("VP", 3),
    ("VICE PRESIDENT", 3),
    ("SVP", 3),
    ("EVP", 3),
    ("SENIOR VICE PRESIDENT", 3),
    ("EXECUTIVE VICE PRESIDENT", 3),
    ("CMO", 3),
    ("CHIEF MARKETING OFFICER", 3),
    ("CHIEF COMPLIANCE OFFICER", 3),
    ("CHIEF PORTFOLIO MANAGER", 3),
    ("CEO", 2),
    ("CHIEF EXECUTIVE OFFICER", 2),
    ("PRESIDENT", 2),
    ("OFFICER", 1),
    ("DIRECTOR", 1),
];

/// Weight used when no title keyword matches but a flag is set
const FLAG_ONLY_WEIGHT: u32 = 1;

/// Weight at or above which a person counts as a key officer
pub const KEY_OFFICER_WEIGHT: u32 = 3;

/// Max weight over every matching title keyword, else a flag-based weight
pub fn compute_role_weight(title: &str, is_director: bool, is_officer: bool) -> u32 {
    let title_u = title.to_uppercase();

    let max_weight = ROLE_WEIGHTS
        .iter()
        .filter(|(key, _)| title_u.contains(key))
        .map(|(_, weight)| *weight)
        .max()
        .unwrap_or(0);

    if max_weight > 0 {
        return max_weight;
    }

    if is_officer || is_director {
        FLAG_ONLY_WEIGHT
    } else {
        0
    }
}

/// Key roles surfaced on a cluster event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub enum KeyRole {
    #[serde(rename = "CFO")]
    Cfo,
    #[serde(rename = "GC")]
    Gc,
    #[serde(rename = "CEO")]
    Ceo,
}

impl KeyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyRole::Cfo => "CFO",
            KeyRole::Gc => "GC",
            KeyRole::Ceo => "CEO",
        }
    }

    fn markers(&self) -> [&'static str; 2] {
        match self {
            KeyRole::Cfo => ["CFO", "CHIEF FINANCIAL OFFICER"],
            KeyRole::Gc => ["GENERAL COUNSEL", "CHIEF LEGAL OFFICER"],
            KeyRole::Ceo => ["CEO", "CHIEF EXECUTIVE OFFICER"],
        }
    }

    pub fn all() -> [KeyRole; 3] {
        [KeyRole::Cfo, KeyRole::Gc, KeyRole::Ceo]
    }

    pub fn matches(&self, title: &str) -> bool {
        let title_u = title.to_uppercase();
        self.markers().iter().any(|m| title_u.contains(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_weights() {
        assert_eq!(compute_role_weight("CFO", false, true), 4);
        assert_eq!(compute_role_weight("General Counsel & Secretary", false, true), 4);
        assert_eq!(compute_role_weight("EVP, Operations", false, false), 3);
        assert_eq!(compute_role_weight("Chief Executive Officer", false, true), 2);
        assert_eq!(compute_role_weight("Director", true, false), 1);
    }

    #[test]
    fn test_max_not_sum() {
        // Matches VP, SVP, SENIOR VICE PRESIDENT, VICE PRESIDENT and PRESIDENT
        assert_eq!(compute_role_weight("Senior Vice President", false, true), 3);
        // CEO (2) and CFO (4) in one title -> 4, never 6
        assert_eq!(compute_role_weight("CEO and CFO", false, true), 4);
        // "CHIEF EXECUTIVE OFFICER" also contains "OFFICER" (1)
        assert_eq!(compute_role_weight("CHIEF EXECUTIVE OFFICER", false, false), 2);
    }

    #[test]
    fn test_substring_semantics_preserved() {
        // "COO" inside an unrelated word still counts
        assert_eq!(compute_role_weight("Head of Cooperative Affairs", false, false), 3);
    }

    #[test]
    fn test_flag_fallback() {
        assert_eq!(compute_role_weight("", false, true), 1);
        assert_eq!(compute_role_weight("", true, false), 1);
        assert_eq!(compute_role_weight("Chairman", true, true), 1);
        assert_eq!(compute_role_weight("", false, false), 0);
        assert_eq!(compute_role_weight("10% Owner", false, false), 0);
    }

    #[test]
    fn test_key_roles() {
        assert!(KeyRole::Cfo.matches("Chief Financial Officer"));
        assert!(KeyRole::Gc.matches("EVP, Chief Legal Officer"));
        assert!(KeyRole::Ceo.matches("President & CEO"));
        assert!(!KeyRole::Ceo.matches("CFO"));
    }
}
