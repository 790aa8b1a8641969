//! Registry: one current-state row per identifier.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::types::RegistryEntry;
use crate::uri::Uri;

/// Column order expected by [`registry_from_row`].
pub const REGISTRY_COLUMNS: &str =
    "uri, display_name, payload, last_ledger_id, created_at, updated_at";

/// Map a row selected with [`REGISTRY_COLUMNS`]. Unreadable payload JSON
/// becomes an empty object.
pub fn registry_from_row(row: &Row) -> rusqlite::Result<RegistryEntry> {
    let payload: String = row.get(2)?;
    Ok(RegistryEntry {
        uri: row.get(0)?,
        display_name: row.get(1)?,
        payload: serde_json::from_str(&payload).unwrap_or_else(|_| serde_json::json!({})),
        last_ledger_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub fn get_record(conn: &Connection, uri: &Uri) -> Result<Option<RegistryEntry>> {
    let record = conn
        .query_row(
            &format!("SELECT {REGISTRY_COLUMNS} FROM registry WHERE uri = ?1"),
            params![uri.to_string()],
            registry_from_row,
        )
        .optional()?;
    Ok(record)
}

/// Exact display-name lookup, ignoring case. When several subjects share a
/// name the most recently touched one wins.
pub fn find_by_display_name(conn: &Connection, name: &str) -> Result<Option<RegistryEntry>> {
    let record = conn
        .query_row(
            &format!(
                "SELECT {REGISTRY_COLUMNS} FROM registry \
                 WHERE display_name = ?1 COLLATE NOCASE \
                 ORDER BY updated_at DESC LIMIT 1"
            ),
            params![name.trim()],
            registry_from_row,
        )
        .optional()?;
    Ok(record)
}

/// Fuzzy display-name lookup: case-insensitive substring match, most recently
/// touched first.
pub fn search_records(conn: &Connection, fragment: &str, limit: usize) -> Result<Vec<RegistryEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REGISTRY_COLUMNS} FROM registry \
         WHERE display_name LIKE ?1 ESCAPE '\\' \
         ORDER BY updated_at DESC LIMIT ?2"
    ))?;
    let records = stmt
        .query_map(
            params![super::like_pattern(fragment.trim()), limit as i64],
            registry_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Create the record for `uri`, or repoint an existing one at `ledger_id`.
///
/// An existing record keeps its display name and payload. Returns the record
/// and whether it was created. Repointing at the same ledger id is a no-op.
pub(crate) fn upsert_record(
    conn: &Connection,
    uri: &Uri,
    display_name: &str,
    ledger_id: &str,
) -> Result<(RegistryEntry, bool)> {
    if let Some(existing) = get_record(conn, uri)? {
        if existing.last_ledger_id == ledger_id {
            return Ok((existing, false));
        }
        let now = super::now();
        conn.execute(
            "UPDATE registry SET last_ledger_id = ?1, updated_at = ?2 WHERE uri = ?3",
            params![ledger_id, now, existing.uri],
        )?;
        return Ok((
            RegistryEntry {
                last_ledger_id: ledger_id.to_string(),
                updated_at: now,
                ..existing
            },
            false,
        ));
    }

    let now = super::now();
    let uri_str = uri.to_string();
    conn.execute(
        "INSERT INTO registry (uri, display_name, payload, last_ledger_id, created_at, updated_at) \
         VALUES (?1, ?2, '{}', ?3, ?4, ?4)",
        params![uri_str, display_name, ledger_id, now],
    )?;
    tracing::info!(uri = %uri_str, display_name = %display_name, "registry entry created");

    Ok((
        RegistryEntry {
            uri: uri_str,
            display_name: display_name.to_string(),
            payload: serde_json::json!({}),
            last_ledger_id: ledger_id.to_string(),
            created_at: now.clone(),
            updated_at: now,
        },
        true,
    ))
}

/// Repoint the record's audit pointer, if the record exists.
pub(crate) fn touch_record(conn: &Connection, uri: &Uri, ledger_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE registry SET last_ledger_id = ?1, updated_at = ?2 WHERE uri = ?3",
        params![ledger_id, super::now(), uri.to_string()],
    )?;
    Ok(())
}

/// Permanently remove a registry record. Vault rows are left alone.
///
/// Discouraged: the subject loses its display name and "last touched" audit
/// pointer, so queries can no longer resolve it by name.
pub fn hard_delete_record(conn: &Connection, uri: &Uri) -> Result<bool> {
    tracing::warn!(uri = %uri, "hard-deleting registry entry; audit traceability is lost");
    let rows = conn.execute("DELETE FROM registry WHERE uri = ?1", params![uri.to_string()])?;
    Ok(rows > 0)
}
