//! Composite cluster scoring for merged insider buy windows

/// Fixed tunables for the cluster score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub role: f64,
    pub people: f64,
    pub value: f64,
    /// Applied as a penalty on the fund share of all insiders
    pub fund: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            role: 2.0,
            people: 1.0,
            value: 2.0,
            fund: 2.0,
        }
    }
}

pub struct ClusterScorer {
    weights: ScoreWeights,
}

impl ClusterScorer {
    pub fn new() -> Self {
        Self::with_weights(ScoreWeights::default())
    }

    pub fn with_weights(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    /// Compute the ranking score for a cluster window
    ///
    /// # Factors
    /// - Role score (higher is better)
    /// - Distinct people (higher is better)
    /// - Total value, log10-dampened so one large trade cannot dominate
    /// - Fund share of all insiders (penalized)
    pub fn score(
        &self,
        people: usize,
        role_score: u32,
        total_value_usd: f64,
        funds: usize,
        all_insiders: usize,
    ) -> f64 {
        let all_insiders = all_insiders.max(1);

        let value_score = if total_value_usd > 0.0 {
            (total_value_usd + 1.0).log10()
        } else {
            0.0
        };
        let fund_ratio = funds as f64 / all_insiders as f64;

        self.weights.role * role_score as f64
            + self.weights.people * people as f64
            + self.weights.value * value_score
            - self.weights.fund * fund_ratio
    }
}

impl Default for ClusterScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Score with the default weights
pub fn compute_cluster_score(
    people: usize,
    role_score: u32,
    total_value_usd: f64,
    funds: usize,
    all_insiders: usize,
) -> f64 {
    ClusterScorer::new().score(people, role_score, total_value_usd, funds, all_insiders)
}
