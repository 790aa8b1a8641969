//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use dojo::config::DojoConfig;
use dojo::db;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &DojoConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `dojo summon \"...\"` or `dojo serve` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map_or(0, |m| m.len());

    let conn = db::open_database(&db_path)
        .context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn)
        .context("failed to run health check")?;

    println!("Dojo Health Report");
    println!("==================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Row counts:");
    println!("  Ledger entries:  {} ({} ghosted)", report.ledger_count, report.ghosted_count);
    println!("  Registry:        {}", report.registry_count);
    println!("  Vault facts:     {} ({} deleted)", report.vault_count, report.deleted_count);
    println!("  History:         {}", report.history_count);
    println!();
    println!("Inference:         {}", if config.inference.enabled { "enabled" } else { "disabled (rules only)" });
    if config.inference.enabled {
        println!("  Endpoint:        {}", config.inference.base_url);
        println!("  Model:           {}", config.inference.model);
        println!("  Run `dojo health` to check it.");
    }
    println!();
    if report.dangling_receipts == 0 {
        println!("Audit chain:       OK");
    } else {
        println!(
            "Audit chain:       BROKEN ({} vault rows point at missing ledger entries)",
            report.dangling_receipts
        );
    }
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db {}", db_path.display());
        println!("  2. Or export what is still readable: dojo export --include-sensitive > ledger.json");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_sizes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
