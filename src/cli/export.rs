use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

use dojo::config::DojoConfig;
use dojo::ledger::entries::all_entries;
use dojo::ledger::registry::{registry_from_row, REGISTRY_COLUMNS};
use dojo::ledger::types::{LedgerEntry, RegistryEntry, VaultEntry};
use dojo::ledger::vault::{vault_from_row, VAULT_COLUMNS};

const REDACTED: &str = "[redacted]";

/// Export format: the three tables in full.
#[derive(Debug, Serialize)]
struct ExportData {
    ledger: Vec<LedgerEntry>,
    registry: Vec<RegistryEntry>,
    vault: Vec<VaultEntry>,
}

fn collect(conn: &Connection, include_sensitive: bool) -> Result<ExportData> {
    let ledger = all_entries(conn)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {REGISTRY_COLUMNS} FROM registry ORDER BY created_at"
    ))?;
    let registry = stmt
        .query_map([], registry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {VAULT_COLUMNS} FROM vault ORDER BY uri, key"
    ))?;
    let vault = stmt
        .query_map([], vault_from_row)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|mut v| {
            if v.sensitive && !include_sensitive && v.value.is_some() {
                v.value = Some(REDACTED.into());
            }
            v
        })
        .collect();

    Ok(ExportData {
        ledger,
        registry,
        vault,
    })
}

/// Export the whole ledger as JSON to stdout. Sensitive values are redacted
/// unless `include_sensitive`.
pub fn export(config: &DojoConfig, include_sensitive: bool) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = dojo::db::open_database(&db_path)?;

    let data = collect(&conn, include_sensitive)?;

    let json = serde_json::to_string_pretty(&data)?;
    println!("{json}");

    eprintln!(
        "Exported {} ledger entries, {} records and {} facts.",
        data.ledger.len(),
        data.registry.len(),
        data.vault.len()
    );

    Ok(())
}
