use anyhow::Result;

use dojo::config::DojoConfig;

/// List the most recent ledger entries.
pub fn recent(config: &DojoConfig, limit: usize) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = dojo::db::open_database(&db_path)?;

    let entries = dojo::ledger::entries::recent_entries(&conn, limit)?;
    if entries.is_empty() {
        println!("The ledger is empty.");
        return Ok(());
    }

    println!("Recent summonings");
    println!("{}", "=".repeat(40));
    for e in &entries {
        let ghost = if e.ghosted_at.is_some() { " (ghosted)" } else { "" };
        println!("  {} [{}]{}", e.created_at, e.kind, ghost);
        println!("    {}", super::preview(&e.raw_text, 100));
        if let Some(ref target) = e.target_uri {
            println!("    -> {target}");
        }
        println!("    id: {}", e.id);
    }

    Ok(())
}
