pub mod doctor;
pub mod export;
pub mod health;
pub mod history;
pub mod inspect;
pub mod recent;
pub mod search;
pub mod summon;

use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};

use dojo::config::DojoConfig;
use dojo::inference::Orchestrator;
use dojo::summon::Summoner;
use dojo::uri::Uri;

/// Open the configured database and wire a [`Summoner`] around it.
pub fn open_summoner(config: &DojoConfig) -> Result<Summoner> {
    let db_path = config.resolved_db_path();
    let conn = dojo::db::open_database(&db_path)?;
    let orchestrator = Orchestrator::from_config(&config.inference)
        .context("failed to set up inference endpoint")?;
    Ok(Summoner::new(
        Arc::new(Mutex::new(conn)),
        Arc::new(orchestrator),
        config.query.clone(),
    ))
}

/// Resolve a CLI subject argument (identifier or display name), failing with
/// a readable message when nothing matches.
pub async fn require_subject(summoner: &Summoner, subject: &str) -> Result<Uri> {
    summoner
        .resolve_subject(subject)
        .await?
        .with_context(|| format!("no subject matches \"{subject}\""))
}

/// Cut `text` to `max` characters for one-line listings.
pub fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}
