//! Insider Core - Cluster-Buy Detection Engine
//!
//! Finds episodes where several insiders of one issuer buy inside overlapping
//! lookback windows, then classifies, weights and scores the participants.
//!
//! # Architecture
//!
//! ```text
//! SQLite insider_buy_signals → SqliteSignalStore (scope + exclusions)
//!     ↓
//! Raw windows per transaction → threshold filter → dedup
//!     ↓
//! Interval union per ticker
//!     ↓
//! Recompute per interval (InsiderClassifier via SqliteEntityStore, role weights)
//!     ↓
//! ClusterScorer → post filters → rank → top N
//!     ↓
//! EventWriter → JSONL or text
//! ```

pub mod classifier;
pub mod detector;
pub mod entity_store;
pub mod exclusions;
pub mod jsonl_writer;
pub mod normalizer;
pub mod roles;
pub mod scorer;
pub mod sqlite_reader;
pub mod sqlite_writer;
pub mod window;

pub use classifier::{
    classify_by_rules, Classification, ClassificationSource, EntityType, FallbackClassifier,
    InsiderClassifier, StubAiClassifier,
};
pub use detector::{ClusterDetector, ClusterQuery, MergedClusterEvent};
pub use entity_store::{EntityResolver, InsiderEntity, SqliteEntityStore};
pub use exclusions::{ExclusionList, ExclusionMatcher};
pub use jsonl_writer::{summary_line, EventWriter, OutputFormat};
pub use normalizer::{normalize_insider_name, InsiderFlags, Transaction};
pub use roles::{compute_role_weight, KeyRole};
pub use scorer::{compute_cluster_score, ClusterScorer, ScoreWeights};
pub use sqlite_reader::{SignalSource, SqliteSignalStore, TransactionScope};
pub use sqlite_writer::{IngestOutcome, SignalWriter};
pub use window::{merge_intervals, DateInterval, RawWindow};
