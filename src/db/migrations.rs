//! Forward-only schema migrations.
//!
//! `schema_meta.schema_version` records the last applied step. Each step in
//! [`MIGRATIONS`] runs in its own transaction together with the version bump.

use rusqlite::{Connection, OptionalExtension};

struct Migration {
    /// Version the database is at after this step.
    to: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    to: 2,
    name: "ledger ghosting",
    sql: "ALTER TABLE ledger ADD COLUMN ghosted_at TEXT;",
}];

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Stored schema version; a missing or unreadable row counts as 0.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM schema_meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(stored.and_then(|v| v.parse().ok()).unwrap_or(0))
}

/// Apply every step above the stored version, in order.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let from = get_schema_version(conn)?;
    tracing::debug!(schema_version = from, target = CURRENT_SCHEMA_VERSION, "checking migrations");

    for step in MIGRATIONS.iter().filter(|m| m.to > from) {
        tracing::info!(to = step.to, name = step.name, "running migration");
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(step.sql)?;
        tx.execute(
            "INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
            [step.to.to_string()],
        )?;
        tx.commit()?;
    }

    Ok(())
}
