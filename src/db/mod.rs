pub mod migrations;
pub mod queries;

use std::time::Duration;

use anyhow::Context;
use rusqlite::Connection;

/// How long a writer waits on a locked database before giving up. Booking
/// creation takes the write lock up front, so concurrent requests queue here.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {path}"))?;

    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set busy timeout")?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn)?;
    tracing::debug!(path, "database ready");

    Ok(conn)
}
