//! SQL DDL for all ledger tables.
//!
//! Defines `ledger` (one row per summoning), `registry` (current state per
//! identifier), `vault` (one fact per identifier/key), `vault_history`
//! (every vault mutation) and `schema_meta`. All DDL uses `IF NOT EXISTS`
//! for idempotent initialization.

use rusqlite::Connection;

/// All schema DDL statements for the ledger's core tables.
const SCHEMA_SQL: &str = r#"
-- Immutable interaction log
CREATE TABLE IF NOT EXISTS ledger (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL CHECK(kind IN ('statement_input','question_request','derived_synthesis')),
    raw_text TEXT NOT NULL,
    target_uri TEXT,
    parent_id TEXT REFERENCES ledger(id),
    metadata TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ledger_created ON ledger(created_at);
CREATE INDEX IF NOT EXISTS idx_ledger_target ON ledger(target_uri);

-- Current-state projection per identifier
CREATE TABLE IF NOT EXISTS registry (
    uri TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    payload TEXT NOT NULL DEFAULT '{}',
    last_ledger_id TEXT NOT NULL REFERENCES ledger(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_registry_name ON registry(display_name);

-- Audited facts; value NULL means soft-deleted
CREATE TABLE IF NOT EXISTS vault (
    uri TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT,
    audit_ledger_id TEXT NOT NULL REFERENCES ledger(id),
    sensitive INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (uri, key)
);

-- Every vault mutation, oldest first by id
CREATE TABLE IF NOT EXISTS vault_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uri TEXT NOT NULL,
    key TEXT NOT NULL,
    operation TEXT NOT NULL CHECK(operation IN ('set','delete')),
    value TEXT,
    ledger_id TEXT NOT NULL REFERENCES ledger(id),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_fact ON vault_history(uri, key);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for expected in ["ledger", "registry", "vault", "vault_history", "schema_meta"] {
            assert!(tables.contains(&expected.to_string()), "{expected} table missing");
        }
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn vault_requires_existing_ledger_entry() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        init_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO vault (uri, key, value, audit_ledger_id, updated_at) \
             VALUES ('dojo.con.joe', 'coffee', 'Espresso', 'missing', '2026-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err(), "dangling audit pointer must be refused");
    }
}
