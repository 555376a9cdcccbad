//! Runtime configuration from environment variables
//!
//! Defaults live here and are turned into an explicit [`ClusterQuery`] before
//! any detection runs; the engine itself never reads the environment.

use crate::error::{InsiderError, Result};
use crate::insider_core::detector::ClusterQuery;
use std::env;

/// Configuration for the insiderflow binaries
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Path to SQLite database file (required before first storage access)
    pub db_path: Option<String>,

    /// Raw window length in days
    pub window_days: u32,

    /// Days before the latest transaction date included in detection
    pub lookback_days: u32,

    /// Minimum distinct insiders per window
    pub min_insiders: usize,

    /// Number of ranked events returned by the CLI
    pub top_n: usize,
}

impl ClusterConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `INSIDERFLOW_DB_PATH` (no default)
    /// - `CLUSTER_WINDOW_DAYS` (default: 10)
    /// - `CLUSTER_LOOKBACK_DAYS` (default: 90)
    /// - `CLUSTER_MIN_INSIDERS` (default: 2)
    /// - `CLUSTER_TOP_N` (default: 20)
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("INSIDERFLOW_DB_PATH")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),

            window_days: env::var("CLUSTER_WINDOW_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),

            lookback_days: env::var("CLUSTER_LOOKBACK_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(90),

            min_insiders: env::var("CLUSTER_MIN_INSIDERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),

            top_n: env::var("CLUSTER_TOP_N")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
        }
    }

    /// Database path, or a configuration error when none was provided
    pub fn db_path(&self) -> Result<&str> {
        self.db_path.as_deref().ok_or_else(|| {
            InsiderError::Config("INSIDERFLOW_DB_PATH is not set; configure it in .env".to_string())
        })
    }

    /// Detection parameters seeded from the configured defaults
    pub fn default_query(&self) -> ClusterQuery {
        ClusterQuery {
            window_days: self.window_days,
            lookback_days: self.lookback_days,
            min_insiders: self.min_insiders,
            limit: Some(self.top_n),
            ..ClusterQuery::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both cases share process env, so they run in one test.
    #[test]
    fn test_config_from_env() {
        env::remove_var("INSIDERFLOW_DB_PATH");
        env::remove_var("CLUSTER_WINDOW_DAYS");
        env::remove_var("CLUSTER_LOOKBACK_DAYS");
        env::remove_var("CLUSTER_MIN_INSIDERS");
        env::remove_var("CLUSTER_TOP_N");

        let config = ClusterConfig::from_env();
        assert!(config.db_path.is_none());
        assert_eq!(config.window_days, 10);
        assert_eq!(config.lookback_days, 90);
        assert_eq!(config.min_insiders, 2);
        assert_eq!(config.top_n, 20);

        let err = config.db_path().unwrap_err();
        assert!(matches!(err, InsiderError::Config(_)));
        assert!(err.to_string().contains("INSIDERFLOW_DB_PATH"));

        env::set_var("INSIDERFLOW_DB_PATH", "/tmp/insiders.db");
        env::set_var("CLUSTER_WINDOW_DAYS", "14");
        env::set_var("CLUSTER_LOOKBACK_DAYS", "not-a-number");
        env::set_var("CLUSTER_TOP_N", "5");

        let config = ClusterConfig::from_env();
        assert_eq!(config.db_path().unwrap(), "/tmp/insiders.db");
        assert_eq!(config.window_days, 14);
        assert_eq!(config.lookback_days, 90); // unparsable falls back
        assert_eq!(config.top_n, 5);

        let query = config.default_query();
        assert_eq!(query.window_days, 14);
        assert_eq!(query.limit, Some(5));
        assert!(query.use_exclusions);

        env::remove_var("INSIDERFLOW_DB_PATH");
        env::remove_var("CLUSTER_WINDOW_DAYS");
        env::remove_var("CLUSTER_LOOKBACK_DAYS");
        env::remove_var("CLUSTER_TOP_N");
    }
}
