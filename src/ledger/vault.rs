//! Vault write path and reads.
//!
//! [`apply_extraction`] and [`soft_delete`] are the only mutations. Both stamp
//! the fact with the ledger entry that caused it and append a row to
//! `vault_history`. A soft delete keeps the row and key and only nulls the
//! value, so the deletion itself stays auditable.

use anyhow::{bail, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::entries::ledger_exists;
use super::registry;
use super::types::{AppliedFact, HistoryEntry, VaultEntry};
use crate::extract::Triple;
use crate::uri::{Namespace, Uri};

/// Column order expected by [`vault_from_row`].
pub const VAULT_COLUMNS: &str = "uri, key, value, audit_ledger_id, sensitive, updated_at";

/// Key fragments that mark a fact as a secret.
const SENSITIVE_KEY_PARTS: &[&str] = &["password", "passcode", "pin", "code", "ssn", "secret"];

pub fn vault_from_row(row: &Row) -> rusqlite::Result<VaultEntry> {
    Ok(VaultEntry {
        uri: row.get(0)?,
        key: row.get(1)?,
        value: row.get(2)?,
        audit_ledger_id: row.get(3)?,
        sensitive: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Medical subjects and secret-looking keys are sensitive.
pub fn is_sensitive(uri: &Uri, key: &str) -> bool {
    uri.namespace() == Namespace::Medical
        || key.split('_').any(|part| SENSITIVE_KEY_PARTS.contains(&part))
}

/// Store one extracted fact under the receipt of `ledger_id`.
///
/// Upserts the registry record for the subject (created with the triple's
/// display name if new, otherwise only repointed), then the vault row.
/// Re-applying the same triple with the same ledger id changes nothing.
/// The ledger entry must already exist.
pub fn apply_extraction(conn: &mut Connection, triple: &Triple, ledger_id: &str) -> Result<AppliedFact> {
    let tx = conn.transaction()?;

    if !ledger_exists(&tx, ledger_id)? {
        bail!("ledger entry not found: {ledger_id}");
    }

    let (registry, created_registry) =
        registry::upsert_record(&tx, &triple.uri, &triple.subject, ledger_id)?;

    let existing = get_attribute(&tx, &triple.uri, &triple.key)?;
    let vault = match existing {
        Some(current)
            if current.value.as_deref() == Some(triple.value.as_str())
                && current.audit_ledger_id == ledger_id =>
        {
            current
        }
        _ => {
            let now = super::now();
            let uri = triple.uri.to_string();
            let sensitive = is_sensitive(&triple.uri, &triple.key);
            tx.execute(
                "INSERT INTO vault (uri, key, value, audit_ledger_id, sensitive, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(uri, key) DO UPDATE SET \
                 value = excluded.value, audit_ledger_id = excluded.audit_ledger_id, \
                 sensitive = excluded.sensitive, updated_at = excluded.updated_at",
                params![uri, triple.key, triple.value, ledger_id, sensitive, now],
            )?;
            write_history(&tx, &uri, &triple.key, "set", Some(&triple.value), ledger_id)?;
            VaultEntry {
                uri,
                key: triple.key.clone(),
                value: Some(triple.value.clone()),
                audit_ledger_id: ledger_id.to_string(),
                sensitive,
                updated_at: now,
            }
        }
    };

    tx.commit()?;

    tracing::info!(
        uri = %vault.uri,
        key = %vault.key,
        ledger_id = %ledger_id,
        created_registry,
        "fact applied"
    );

    Ok(AppliedFact {
        registry,
        vault,
        created_registry,
    })
}

/// Soft delete: null the value, keep the row and key, and repoint the audit
/// receipt at the deletion event.
pub fn soft_delete(
    conn: &mut Connection,
    uri: &Uri,
    key: &str,
    deletion_ledger_id: &str,
) -> Result<VaultEntry> {
    let tx = conn.transaction()?;

    if !ledger_exists(&tx, deletion_ledger_id)? {
        bail!("ledger entry not found: {deletion_ledger_id}");
    }

    let Some(current) = get_attribute(&tx, uri, key)? else {
        bail!("attribute not found: {uri} / {key}");
    };

    if current.is_deleted() && current.audit_ledger_id == deletion_ledger_id {
        return Ok(current);
    }

    let now = super::now();
    tx.execute(
        "UPDATE vault SET value = NULL, audit_ledger_id = ?1, updated_at = ?2 \
         WHERE uri = ?3 AND key = ?4",
        params![deletion_ledger_id, now, current.uri, key],
    )?;
    write_history(&tx, &current.uri, key, "delete", None, deletion_ledger_id)?;
    registry::touch_record(&tx, uri, deletion_ledger_id)?;

    tx.commit()?;

    tracing::info!(uri = %uri, key = %key, ledger_id = %deletion_ledger_id, "fact soft-deleted");

    Ok(VaultEntry {
        value: None,
        audit_ledger_id: deletion_ledger_id.to_string(),
        updated_at: now,
        ..current
    })
}

fn write_history(
    conn: &Connection,
    uri: &str,
    key: &str,
    operation: &str,
    value: Option<&str>,
    ledger_id: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO vault_history (uri, key, operation, value, ledger_id, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![uri, key, operation, value, ledger_id, super::now()],
    )?;
    Ok(())
}

/// One fact, deleted or not.
pub fn get_attribute(conn: &Connection, uri: &Uri, key: &str) -> Result<Option<VaultEntry>> {
    let entry = conn
        .query_row(
            &format!("SELECT {VAULT_COLUMNS} FROM vault WHERE uri = ?1 AND key = ?2"),
            params![uri.to_string(), key],
            vault_from_row,
        )
        .optional()?;
    Ok(entry)
}

/// All facts for a subject, ordered by key. Soft-deleted rows only with
/// `include_deleted`.
pub fn get_by_uri(conn: &Connection, uri: &Uri, include_deleted: bool) -> Result<Vec<VaultEntry>> {
    let filter = if include_deleted { "" } else { " AND value IS NOT NULL" };
    let mut stmt = conn.prepare(&format!(
        "SELECT {VAULT_COLUMNS} FROM vault WHERE uri = ?1{filter} ORDER BY key"
    ))?;
    let entries = stmt
        .query_map(params![uri.to_string()], vault_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// Live facts sharing `key` across all subjects, most recent first.
pub fn get_by_key(conn: &Connection, key: &str) -> Result<Vec<VaultEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VAULT_COLUMNS} FROM vault WHERE key = ?1 AND value IS NOT NULL \
         ORDER BY updated_at DESC"
    ))?;
    let entries = stmt
        .query_map(params![key], vault_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// Whether any vault row (deleted or not) exists under `uri`.
pub fn has_facts(conn: &Connection, uri: &Uri) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM vault WHERE uri = ?1",
        params![uri.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Every mutation of one fact, oldest first. A receipt whose ledger entry is
/// gone is reported with `origin_text: None` rather than failing.
pub fn attribute_history(conn: &Connection, uri: &Uri, key: &str) -> Result<Vec<HistoryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT h.operation, h.value, h.ledger_id, l.raw_text, h.created_at \
         FROM vault_history h LEFT JOIN ledger l ON l.id = h.ledger_id \
         WHERE h.uri = ?1 AND h.key = ?2 ORDER BY h.id",
    )?;
    let history = stmt
        .query_map(params![uri.to_string(), key], |row| {
            Ok(HistoryEntry {
                operation: row.get(0)?,
                value: row.get(1)?,
                ledger_id: row.get(2)?,
                origin_text: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(history)
}
