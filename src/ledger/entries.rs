//! Ledger entries: written once per summoning, never deleted.

use anyhow::{bail, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::types::{LedgerEntry, LedgerKind, SummoningMetadata};
use crate::uri::Uri;

pub(crate) const LEDGER_COLUMNS: &str =
    "id, kind, raw_text, target_uri, parent_id, metadata, created_at, ghosted_at";

/// Map a row selected with [`LEDGER_COLUMNS`].
pub(crate) fn ledger_from_row(row: &Row) -> rusqlite::Result<LedgerEntry> {
    let kind: String = row.get(1)?;
    let metadata: Option<String> = row.get(5)?;
    Ok(LedgerEntry {
        id: row.get(0)?,
        kind: kind.parse().map_err(|_| rusqlite::Error::InvalidQuery)?,
        raw_text: row.get(2)?,
        target_uri: row.get(3)?,
        parent_id: row.get(4)?,
        metadata: metadata
            .and_then(|m| serde_json::from_str(&m).ok())
            .unwrap_or_default(),
        created_at: row.get(6)?,
        ghosted_at: row.get(7)?,
    })
}

/// Record one interaction. Never fails for extraction reasons: an entry
/// with no `target` is a summoning nothing was extracted from.
pub fn record_summoning(
    conn: &Connection,
    text: &str,
    kind: LedgerKind,
    target: Option<&Uri>,
    parent_id: Option<&str>,
    metadata: &SummoningMetadata,
) -> Result<LedgerEntry> {
    let id = uuid::Uuid::now_v7().to_string();
    let now = super::now();
    let metadata_json = serde_json::to_string(metadata)?;
    let target_uri = target.map(|u| u.to_string());

    conn.execute(
        "INSERT INTO ledger (id, kind, raw_text, target_uri, parent_id, metadata, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![id, kind.as_str(), text, target_uri, parent_id, metadata_json, now],
    )?;

    tracing::debug!(id = %id, kind = %kind, target = ?target_uri, "ledger entry recorded");

    Ok(LedgerEntry {
        id,
        kind,
        raw_text: text.to_string(),
        target_uri,
        parent_id: parent_id.map(str::to_string),
        metadata: metadata.clone(),
        created_at: now,
        ghosted_at: None,
    })
}

pub fn get_entry(conn: &Connection, id: &str) -> Result<Option<LedgerEntry>> {
    let entry = conn
        .query_row(
            &format!("SELECT {LEDGER_COLUMNS} FROM ledger WHERE id = ?1"),
            params![id],
            ledger_from_row,
        )
        .optional()?;
    Ok(entry)
}

pub(crate) fn ledger_exists(conn: &Connection, id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM ledger WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Most recent entries first.
pub fn recent_entries(conn: &Connection, limit: usize) -> Result<Vec<LedgerEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LEDGER_COLUMNS} FROM ledger ORDER BY created_at DESC, id DESC LIMIT ?1"
    ))?;
    let entries = stmt
        .query_map(params![limit as i64], ledger_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// Every entry, oldest first.
pub fn all_entries(conn: &Connection) -> Result<Vec<LedgerEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LEDGER_COLUMNS} FROM ledger ORDER BY created_at, id"
    ))?;
    let entries = stmt
        .query_map([], ledger_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// Ghost transform: replace an entry's raw text with a summary. Id, kind,
/// target and timestamp are preserved.
pub fn ghost_entry(conn: &Connection, id: &str, summary: &str) -> Result<LedgerEntry> {
    let rows = conn.execute(
        "UPDATE ledger SET raw_text = ?1, ghosted_at = ?2 WHERE id = ?3",
        params![summary, super::now(), id],
    )?;
    if rows == 0 {
        bail!("ledger entry not found: {id}");
    }
    tracing::info!(id = %id, summary_len = summary.len(), "ledger entry ghosted");

    match get_entry(conn, id)? {
        Some(entry) => Ok(entry),
        None => bail!("ledger entry vanished during ghosting: {id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    #[test]
    fn record_and_fetch_entry() {
        let conn = open_memory_database().unwrap();
        let metadata = SummoningMetadata {
            location: Some("47.6,-122.3".into()),
            trigger: Some("voice".into()),
            confidence: Some(0.9),
            ..Default::default()
        };
        let uri: Uri = "dojo.con.joe".parse().unwrap();

        let entry = record_summoning(
            &conn,
            "Joe's coffee is Espresso",
            LedgerKind::StatementInput,
            Some(&uri),
            None,
            &metadata,
        )
        .unwrap();

        let fetched = get_entry(&conn, &entry.id).unwrap().unwrap();
        assert_eq!(fetched.raw_text, "Joe's coffee is Espresso");
        assert_eq!(fetched.kind, LedgerKind::StatementInput);
        assert_eq!(fetched.target_uri.as_deref(), Some("dojo.con.joe"));
        assert_eq!(fetched.metadata, metadata);
        assert!(fetched.ghosted_at.is_none());
    }

    #[test]
    fn recent_entries_newest_first() {
        let conn = open_memory_database().unwrap();
        let meta = SummoningMetadata::default();
        let first = record_summoning(&conn, "one", LedgerKind::StatementInput, None, None, &meta)
            .unwrap();
        let second = record_summoning(
            &conn,
            "two",
            LedgerKind::QuestionRequest,
            None,
            Some(&first.id),
            &meta,
        )
        .unwrap();

        let recent = recent_entries(&conn, 10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, second.id);
        assert_eq!(recent[0].parent_id.as_deref(), Some(first.id.as_str()));

        assert_eq!(recent_entries(&conn, 1).unwrap().len(), 1);
    }

    #[test]
    fn ghosting_preserves_identity() {
        let conn = open_memory_database().unwrap();
        let uri: Uri = "dojo.ent.railroad".parse().unwrap();
        let entry = record_summoning(
            &conn,
            "The gate code for Railroad is 1234, and the lot closes at nine.",
            LedgerKind::StatementInput,
            Some(&uri),
            None,
            &SummoningMetadata::default(),
        )
        .unwrap();

        let ghost = ghost_entry(&conn, &entry.id, "Railroad gate code.").unwrap();
        assert_eq!(ghost.id, entry.id);
        assert_eq!(ghost.kind, entry.kind);
        assert_eq!(ghost.target_uri, entry.target_uri);
        assert_eq!(ghost.created_at, entry.created_at);
        assert_eq!(ghost.raw_text, "Railroad gate code.");
        assert!(ghost.ghosted_at.is_some());
    }

    #[test]
    fn ghosting_missing_entry_fails() {
        let conn = open_memory_database().unwrap();
        let err = ghost_entry(&conn, "nope", "x").unwrap_err();
        assert!(err.to_string().contains("ledger entry not found"));
    }
}
