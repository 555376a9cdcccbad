//! Load Signals - append buy-signal batches to the signal store
//!
//! Every `*.jsonl` file in the input directory is one batch, named after the
//! file stem. Files are loaded in name order; batches already recorded in
//! `ingested_batches` are skipped.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin load_signals -- --dir data/batches
//! ```
//!
//! ## Environment Variables
//!
//! - INSIDERFLOW_DB_PATH - SQLite database path (required unless --db is given)
//! - RUST_LOG - Logging level (optional, default: info)

use clap::Parser;
use insiderflow::insider_core::{IngestOutcome, Transaction};
use insiderflow::{ClusterConfig, Database, InsiderError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "load_signals")]
#[command(about = "Load JSONL insider buy-signal batches into SQLite")]
struct Args {
    /// Directory containing one <batch_id>.jsonl file per batch
    #[arg(long)]
    dir: PathBuf,

    /// SQLite database path (overrides INSIDERFLOW_DB_PATH)
    #[arg(long)]
    db: Option<String>,
}

/// Batch files in name order
fn batch_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "jsonl"))
        .collect();
    files.sort();
    Ok(files)
}

/// Parse one JSON transaction per non-blank line
fn read_batch(path: &Path) -> Result<Vec<Transaction>, InsiderError> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row: Transaction = serde_json::from_str(&line).map_err(|e| {
            InsiderError::InvalidInput(format!("{}:{}: {}", path.display(), idx + 1, e))
        })?;
        rows.push(row);
    }

    Ok(rows)
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

    let db = Database::open(config.db_path()?)?;
    db.init_schema()?;
    let writer = db.writer();

    let files = batch_files(&args.dir)?;
    log::info!("📂 {} batch files in {}", files.len(), args.dir.display());

    let mut loaded = 0usize;
    let mut inserted_total = 0usize;
    for path in &files {
        let Some(batch_id) = path.file_stem().and_then(|s| s.to_str()) else {
            log::warn!("⚠️  Skipping file with non-UTF-8 name: {}", path.display());
            continue;
        };

        if writer.is_batch_loaded(batch_id)? {
            log::info!("⏭️  Batch '{}' already loaded, skipping", batch_id);
            continue;
        }

        let rows = read_batch(path)?;
        if let IngestOutcome::Loaded { inserted, .. } = writer.ingest_batch(batch_id, &rows)? {
            loaded += 1;
            inserted_total += inserted;
        }
    }

    log::info!(
        "✅ Loaded {} new batches ({} buy rows, {} signals total)",
        loaded,
        inserted_total,
        db.signals().count()?
    );
    Ok(())
}
