use anyhow::Result;

use dojo::config::DojoConfig;

/// Substring search across the ledger, registry and vault.
pub fn search(config: &DojoConfig, needle: &str, limit: usize) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = dojo::db::open_database(&db_path)?;

    let hits = dojo::ledger::search::search(&conn, needle, limit)?;
    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    if !hits.records.is_empty() {
        println!("Subjects:");
        for r in &hits.records {
            println!("  {:<30} {}", r.uri, r.display_name);
        }
        println!();
    }

    if !hits.attributes.is_empty() {
        println!("Facts:");
        for v in &hits.attributes {
            println!(
                "  {} {} = {}",
                v.uri,
                v.key,
                v.value.as_deref().unwrap_or_default()
            );
        }
        println!();
    }

    if !hits.ledger.is_empty() {
        println!("Ledger:");
        for (i, e) in hits.ledger.iter().enumerate() {
            println!("  {}. [{}] {} {}", i + 1, e.kind, e.created_at, e.id);
            println!("     {}", super::preview(&e.raw_text, 120));
        }
    }

    Ok(())
}
