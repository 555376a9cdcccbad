//! Cluster Buys - ranked insider cluster-buy events
//!
//! Runs one detection pass over the buy-signal store and prints the ranked
//! events to stdout. Logs go to stderr.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin cluster_buys -- --window 10 --lookback 90 --format text
//! ```
//!
//! ## Environment Variables
//!
//! - INSIDERFLOW_DB_PATH - SQLite database path (required unless --db is given)
//! - CLUSTER_WINDOW_DAYS - Raw window length in days (default: 10)
//! - CLUSTER_LOOKBACK_DAYS - Lookback from the latest transaction date (default: 90)
//! - CLUSTER_MIN_INSIDERS - Minimum distinct insiders (default: 2)
//! - CLUSTER_TOP_N - Events printed (default: 20)
//! - RUST_LOG - Logging level (optional, default: info)

use clap::Parser;
use insiderflow::insider_core::{EventWriter, OutputFormat};
use insiderflow::{ClusterConfig, Database, InsiderError};
use std::io::BufWriter;

#[derive(Parser, Debug)]
#[command(name = "cluster_buys")]
#[command(about = "Detect and rank insider cluster-buy events")]
struct Args {
    /// SQLite database path (overrides INSIDERFLOW_DB_PATH)
    #[arg(long)]
    db: Option<String>,

    /// Raw window length in days
    #[arg(long)]
    window: Option<u32>,

    /// Days before the latest transaction date to include
    #[arg(long)]
    lookback: Option<u32>,

    /// Minimum distinct insiders per window
    #[arg(long)]
    min_insiders: Option<usize>,

    /// Minimum summed value per raw window (USD)
    #[arg(long, default_value = "0")]
    min_total_value: f64,

    /// Minimum value per individual trade (USD)
    #[arg(long, default_value = "0")]
    min_trade_value: f64,

    /// Restrict detection to one ticker
    #[arg(long)]
    ticker: Option<String>,

    /// Number of events to print (0 prints all)
    #[arg(long)]
    limit: Option<usize>,

    /// Ignore the insider exclusion list
    #[arg(long)]
    no_exclusions: bool,

    #[arg(long, default_value = "0")]
    min_role_score: u32,

    /// Minimum distinct non-fund people per event
    #[arg(long)]
    min_people: Option<usize>,

    /// Maximum fund-like share of insiders (0.0 - 1.0)
    #[arg(long)]
    max_fund_ratio: Option<f64>,

    #[arg(long)]
    min_cluster_score: Option<f64>,

    #[arg(long, value_enum, default_value = "jsonl")]
    format: OutputFormat,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let args = Args::parse();
    let mut config = ClusterConfig::from_env();
    if let Some(db) = args.db.clone() {
        config.db_path = Some(db);
    }

    let mut query = config.default_query();
    if let Some(window) = args.window {
        query.window_days = window;
    }
    if let Some(lookback) = args.lookback {
        query.lookback_days = lookback;
    }
    if let Some(min_insiders) = args.min_insiders {
        query.min_insiders = min_insiders;
    }
    if let Some(limit) = args.limit {
        query.limit = if limit == 0 { None } else { Some(limit) };
    }
    query.min_total_value = args.min_total_value;
    query.min_trade_value = args.min_trade_value;
    query.ticker = args.ticker.clone();
    query.use_exclusions = !args.no_exclusions;
    query.min_role_score = args.min_role_score;
    query.min_people = args.min_people;
    query.max_fund_ratio = args.max_fund_ratio;
    query.min_cluster_score = args.min_cluster_score;

    let db_path = config.db_path()?;
    log::info!("🚀 Cluster buy detection");
    log::info!("   ├─ Database: {}", db_path);
    log::info!("   ├─ Window: {} days", query.window_days);
    log::info!("   ├─ Lookback: {} days", query.lookback_days);
    log::info!("   ├─ Min insiders: {}", query.min_insiders);
    log::info!("   └─ Format: {}", args.format.as_str());

    let db = Database::open(db_path)?;
    db.init_schema()?;

    let events = match db.detector().find_cluster_buys(&query) {
        Ok(events) => events,
        Err(InsiderError::NoData(msg)) => {
            log::warn!("⚠️  Nothing to compute: {}", msg);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let stdout = std::io::stdout();
    let mut writer = EventWriter::new(BufWriter::new(stdout.lock()), args.format);
    let written = writer.write_all(&events)?;

    log::info!("✅ {} cluster events written", written);
    Ok(())
}
