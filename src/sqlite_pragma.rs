//! Connection tuning shared by every SQLite handle

use rusqlite::Connection;
use std::time::Duration;

/// How long a writer waits on a locked database before failing
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Apply WAL journaling, relaxed sync, in-memory temp store and busy timeout.
///
/// In-memory databases report `memory` for journal_mode; that is accepted.
pub fn apply_optimized_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    log::debug!("📊 SQLite journal_mode={}", mode);

    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    conn.pragma_update(None, "cache_size", -16_000)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;

    Ok(())
}
