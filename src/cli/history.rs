use anyhow::Result;

use dojo::config::DojoConfig;

/// Print every change to one fact, oldest first, with the text that caused it.
pub async fn history(config: &DojoConfig, subject: &str, key: &str) -> Result<()> {
    let summoner = super::open_summoner(config)?;
    let uri = super::require_subject(&summoner, subject).await?;
    let history = summoner.get_attribute_history(&uri, key).await?;

    if history.is_empty() {
        println!("No history for {key} on {uri}.");
        return Ok(());
    }

    println!("History of {key} on {uri}");
    println!("{}", "=".repeat(50));
    for h in &history {
        let value = h.value.as_deref().unwrap_or("-");
        let origin = h.origin_text.as_deref().unwrap_or("(origin unknown)");
        println!("  {} {:<6} {}", h.created_at, h.operation, value);
        println!("    from: {} ({})", super::preview(origin, 70), h.ledger_id);
    }

    Ok(())
}
