pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Open (or create) the ledger database at the given path with schema
/// initialized and migrations applied.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // Enable WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;
    // Audit pointers are foreign keys; they only hold with this on
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(Duration::from_millis(5000))?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open an in-memory database with schema and migrations applied.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;
    Ok(conn)
}

/// Result of [`check_database_health`].
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub schema_version: u32,
    pub integrity_ok: bool,
    pub integrity_details: String,
    pub ledger_count: u64,
    /// Ledger entries whose text was replaced by a summary.
    pub ghosted_count: u64,
    pub registry_count: u64,
    pub vault_count: u64,
    pub deleted_count: u64,
    pub history_count: u64,
    /// Vault rows whose audit receipt points at a missing ledger entry.
    pub dangling_receipts: u64,
}

/// Run `PRAGMA integrity_check`, count rows and look for broken audit chains.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let schema_version = migrations::get_schema_version(conn)?;

    let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
    let count = |sql: &str| -> Result<u64> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as u64)
    };

    Ok(HealthReport {
        schema_version,
        integrity_ok: integrity == "ok",
        integrity_details: integrity,
        ledger_count: count("SELECT COUNT(*) FROM ledger")?,
        ghosted_count: count("SELECT COUNT(*) FROM ledger WHERE ghosted_at IS NOT NULL")?,
        registry_count: count("SELECT COUNT(*) FROM registry")?,
        vault_count: count("SELECT COUNT(*) FROM vault")?,
        deleted_count: count("SELECT COUNT(*) FROM vault WHERE value IS NULL")?,
        history_count: count("SELECT COUNT(*) FROM vault_history")?,
        dangling_receipts: count(
            "SELECT COUNT(*) FROM vault v LEFT JOIN ledger l ON l.id = v.audit_ledger_id \
             WHERE l.id IS NULL",
        )?,
    })
}
