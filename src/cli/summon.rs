//! CLI write commands: `summon`, `forget` and `ghost`.

use anyhow::Result;

use dojo::config::DojoConfig;
use dojo::ledger::types::SummoningMetadata;

/// Summon one piece of text and print what happened.
pub async fn summon(config: &DojoConfig, text: &str, metadata: SummoningMetadata, json: bool) -> Result<()> {
    let summoner = super::open_summoner(config)?;
    let outcome = summoner.process_summoning(text, metadata).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!("{}", outcome.message);
    println!();
    println!("  Ledger entry:   {} ({})", outcome.ledger_entry.id, outcome.ledger_entry.kind);
    if let Some(ref target) = outcome.ledger_entry.target_uri {
        println!("  Subject:        {target}");
    }
    if let Some(ref vault) = outcome.vault_entry {
        println!("  Fact:           {} = {}", vault.key, vault.value.as_deref().unwrap_or("(deleted)"));
        if vault.sensitive {
            println!("  Sensitive:      yes");
        }
    }
    if outcome.created_new_registry_entry {
        println!("  New subject:    yes");
    }
    println!(
        "  Extraction:     {:?} (confidence {:.2}{})",
        outcome.extraction.source,
        outcome.extraction.confidence,
        outcome
            .extraction
            .rule
            .map(|r| format!(", rule {r}"))
            .unwrap_or_default()
    );

    Ok(())
}

/// Soft-delete one fact.
pub async fn forget(config: &DojoConfig, subject: &str, key: &str) -> Result<()> {
    let summoner = super::open_summoner(config)?;
    let uri = super::require_subject(&summoner, subject).await?;
    let entry = summoner.delete_attribute(&uri, key).await?;

    println!("Forgot {} for {}.", entry.key, entry.uri);
    println!("  Deletion receipt: {}", entry.audit_ledger_id);
    Ok(())
}

/// Replace a ledger entry's text with a short summary.
pub async fn ghost(config: &DojoConfig, id: &str, max_len: usize) -> Result<()> {
    let summoner = super::open_summoner(config)?;
    let entry = summoner.ghost(id, max_len).await?;

    println!("Ghosted {}.", entry.id);
    println!("  Now reads: {}", entry.raw_text);
    Ok(())
}
