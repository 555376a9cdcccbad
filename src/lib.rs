//! insiderflow: SEC Form 3/4/5 insider cluster-buy detection over SQLite

pub mod config;
pub mod db;
pub mod error;
pub mod insider_core;
pub mod sqlite_pragma;

pub use config::ClusterConfig;
pub use db::Database;
pub use error::{InsiderError, Result};
pub use insider_core::{ClusterDetector, ClusterQuery, MergedClusterEvent};
