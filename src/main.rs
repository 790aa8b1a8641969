mod cli;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dojo::config::DojoConfig;
use dojo::ledger::types::SummoningMetadata;

#[derive(Parser)]
#[command(name = "dojo", version, about = "Local audited ledger for the facts you tell it")]
struct Cli {
    /// Config file (default: ~/.dojo/config.toml)
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server
    Serve {
        /// Transport: stdio or http (default from config)
        #[arg(long)]
        transport: Option<String>,
    },
    /// Summon a statement or question
    Summon {
        text: String,
        /// Free-form location to store with the entry
        #[arg(long)]
        location: Option<String>,
        /// What triggered this summoning (voice, widget, ...)
        #[arg(long)]
        trigger: Option<String>,
        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Soft-delete one fact
    Forget {
        /// Identifier (dojo.con.joe) or display name
        subject: String,
        key: String,
    },
    /// Show everything stored about a subject
    Inspect {
        subject: String,
        /// Include soft-deleted facts
        #[arg(long)]
        deleted: bool,
    },
    /// Show the change history of one fact
    History { subject: String, key: String },
    /// List recent ledger entries
    Recent {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Substring search over the ledger, subjects and facts
    Search {
        needle: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Check the inference endpoint
    Health,
    /// Replace a ledger entry's text with a short summary
    Ghost {
        id: String,
        #[arg(long, default_value_t = 80)]
        max_len: usize,
    },
    /// Run database diagnostics
    Doctor,
    /// Export the ledger as JSON to stdout
    Export {
        /// Do not redact sensitive values
        #[arg(long)]
        include_sensitive: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => DojoConfig::load_from(path)?,
        None => DojoConfig::load()?,
    };

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { transport } => {
            let transport = transport.unwrap_or_else(|| config.server.transport.clone());
            match transport.as_str() {
                "stdio" => server::serve_stdio(config).await?,
                "http" | "sse" => server::serve_http(config).await?,
                other => anyhow::bail!("unknown transport: {other} (expected stdio or http)"),
            }
        }
        Command::Summon {
            text,
            location,
            trigger,
            json,
        } => {
            let metadata = SummoningMetadata {
                location,
                trigger: trigger.or_else(|| Some("cli".into())),
                ..Default::default()
            };
            cli::summon::summon(&config, &text, metadata, json).await?;
        }
        Command::Forget { subject, key } => cli::summon::forget(&config, &subject, &key).await?,
        Command::Inspect { subject, deleted } => {
            cli::inspect::inspect(&config, &subject, deleted).await?
        }
        Command::History { subject, key } => cli::history::history(&config, &subject, &key).await?,
        Command::Recent { limit } => cli::recent::recent(&config, limit)?,
        Command::Search { needle, limit } => cli::search::search(&config, &needle, limit)?,
        Command::Health => cli::health::health(&config).await?,
        Command::Ghost { id, max_len } => cli::summon::ghost(&config, &id, max_len).await?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Export { include_sensitive } => cli::export::export(&config, include_sensitive)?,
    }

    Ok(())
}
