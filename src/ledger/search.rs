//! Substring search across all three tables.

use anyhow::Result;
use rusqlite::{params, Connection};
use serde::Serialize;

use super::entries::{ledger_from_row, LEDGER_COLUMNS};
use super::types::{LedgerEntry, RegistryEntry, VaultEntry};
use super::vault::{vault_from_row, VAULT_COLUMNS};

#[derive(Debug, Default, Serialize)]
pub struct SearchHits {
    pub ledger: Vec<LedgerEntry>,
    pub records: Vec<RegistryEntry>,
    pub attributes: Vec<VaultEntry>,
}

impl SearchHits {
    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty() && self.records.is_empty() && self.attributes.is_empty()
    }
}

/// Case-insensitive substring search over ledger text, registry display names
/// and live vault keys/values. `limit` applies per table.
pub fn search(conn: &Connection, needle: &str, limit: usize) -> Result<SearchHits> {
    let needle = needle.trim();
    if needle.is_empty() {
        return Ok(SearchHits::default());
    }
    let pattern = super::like_pattern(needle);

    let mut stmt = conn.prepare(&format!(
        "SELECT {LEDGER_COLUMNS} FROM ledger WHERE raw_text LIKE ?1 ESCAPE '\\' \
         ORDER BY created_at DESC LIMIT ?2"
    ))?;
    let ledger = stmt
        .query_map(params![pattern, limit as i64], ledger_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let records = super::registry::search_records(conn, needle, limit)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {VAULT_COLUMNS} FROM vault \
         WHERE value IS NOT NULL AND (key LIKE ?1 ESCAPE '\\' OR value LIKE ?1 ESCAPE '\\') \
         ORDER BY updated_at DESC LIMIT ?2"
    ))?;
    let attributes = stmt
        .query_map(params![pattern, limit as i64], vault_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        needle = %needle,
        ledger = ledger.len(),
        records = records.len(),
        attributes = attributes.len(),
        "search complete"
    );

    Ok(SearchHits {
        ledger,
        records,
        attributes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::extract::Triple;
    use crate::ledger::entries::record_summoning;
    use crate::ledger::types::{LedgerKind, SummoningMetadata};
    use crate::ledger::vault::apply_extraction;

    #[test]
    fn finds_hits_in_every_table() {
        let mut conn = open_memory_database().unwrap();
        let entry = record_summoning(
            &conn,
            "Joe's coffee is Espresso",
            LedgerKind::StatementInput,
            None,
            None,
            &SummoningMetadata::default(),
        )
        .unwrap();
        let triple = Triple::new("Joe", "coffee", "Espresso").unwrap();
        apply_extraction(&mut conn, &triple, &entry.id).unwrap();

        let hits = search(&conn, "espresso", 10).unwrap();
        assert_eq!(hits.ledger.len(), 1);
        assert_eq!(hits.attributes.len(), 1);
        assert!(hits.records.is_empty());

        let hits = search(&conn, "joe", 10).unwrap();
        assert_eq!(hits.records.len(), 1);
        assert_eq!(hits.ledger.len(), 1);
    }

    #[test]
    fn blank_needle_returns_nothing() {
        let conn = open_memory_database().unwrap();
        assert!(search(&conn, "   ", 10).unwrap().is_empty());
    }
}
