//! CLI `inspect` command: display everything stored about one subject.

use anyhow::Result;

use dojo::config::DojoConfig;

/// Inspect a subject by identifier or display name.
pub async fn inspect(config: &DojoConfig, subject: &str, include_deleted: bool) -> Result<()> {
    let summoner = super::open_summoner(config)?;
    let uri = super::require_subject(&summoner, subject).await?;
    let facts = summoner.get_attributes(&uri, include_deleted).await?;

    let record = summoner.get_record(&uri).await?;

    println!("Subject: {uri}");
    println!("{}", "=".repeat(50));
    match record {
        Some(ref r) => {
            println!("  Display name:   {}", r.display_name);
            println!("  Created:        {}", r.created_at);
            println!("  Updated:        {}", r.updated_at);
            if let Some(last) = summoner.get_ledger_entry(&r.last_ledger_id).await? {
                println!("  Last touched:   {} ({})", super::preview(&last.raw_text, 60), last.id);
            }
            if r.payload.as_object().is_some_and(|o| !o.is_empty()) {
                println!("  Payload:        {}", serde_json::to_string_pretty(&r.payload)?);
            }
        }
        None => println!("  (no registry record)"),
    }

    println!();
    if facts.is_empty() {
        println!("No facts stored.");
        return Ok(());
    }
    println!("Facts:");
    for fact in &facts {
        let value = match (&fact.value, fact.sensitive) {
            (None, _) => "(deleted)".to_string(),
            (Some(v), true) => format!("{v}  [sensitive]"),
            (Some(v), false) => v.clone(),
        };
        println!("  {:<20} {}", fact.key, value);
        println!("  {:<20} receipt {} at {}", "", fact.audit_ledger_id, fact.updated_at);
    }

    Ok(())
}
