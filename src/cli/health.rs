use anyhow::Result;

use dojo::config::DojoConfig;
use dojo::inference::{Orchestrator, ProviderHealth};

/// Check the inference endpoint once and report what it serves.
pub async fn health(config: &DojoConfig) -> Result<()> {
    let inference = &config.inference;
    let orchestrator = Orchestrator::from_config(inference)?;

    println!("Inference endpoint");
    println!("==================");
    println!("  Enabled:        {}", inference.enabled);
    println!("  Base URL:       {}", inference.base_url);
    println!("  Model:          {}", inference.model);
    if !inference.fallback_models.is_empty() {
        println!("  Fallbacks:      {}", inference.fallback_models.join(", "));
    }
    println!();

    match orchestrator.check_health(true).await {
        ProviderHealth::Healthy { model } => {
            println!("Status:           healthy (using {model})");
        }
        ProviderHealth::DegradedNoModel { available } => {
            println!("Status:           reachable, but no configured model is served");
            if available.is_empty() {
                println!("  The endpoint lists no models.");
            } else {
                println!("  Available:      {}", available.join(", "));
            }
        }
        ProviderHealth::Unreachable { reason } => {
            println!("Status:           unreachable ({reason})");
            println!("  Extraction falls back to rules only.");
        }
        ProviderHealth::Unknown => println!("Status:           unknown"),
    }

    Ok(())
}
