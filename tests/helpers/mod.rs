#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use dojo::config::{InferenceConfig, QueryConfig};
use dojo::db;
use dojo::inference::{ModelEndpoint, OfflineEndpoint, Orchestrator};
use dojo::ledger::types::{SummoningMetadata, VaultEntry};
use dojo::summon::{Summoner, SummoningOutcome};
use dojo::uri::Uri;
use rusqlite::Connection;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// Summoner over `conn` with the given endpoint and default settings.
pub fn summoner_on(conn: Connection, endpoint: Arc<dyn ModelEndpoint>) -> Summoner {
    let orchestrator = Orchestrator::new(endpoint, &InferenceConfig::default());
    Summoner::new(
        Arc::new(Mutex::new(conn)),
        Arc::new(orchestrator),
        QueryConfig::default(),
    )
}

/// In-memory summoner whose inference endpoint is always down.
pub fn offline_summoner() -> Summoner {
    summoner_on(test_db(), Arc::new(OfflineEndpoint))
}

/// Summoner backed by an on-disk database at `path`.
pub fn disk_summoner(path: &Path) -> Summoner {
    summoner_on(db::open_database(path).unwrap(), Arc::new(OfflineEndpoint))
}

pub async fn summon(summoner: &Summoner, text: &str) -> SummoningOutcome {
    summoner
        .process_summoning(text, SummoningMetadata::default())
        .await
        .unwrap()
}

pub fn uri(text: &str) -> Uri {
    text.parse().unwrap()
}

/// The stored row for `(uri, key)`, deleted or not.
pub async fn fact(summoner: &Summoner, uri: &Uri, key: &str) -> Option<VaultEntry> {
    summoner
        .get_attributes(uri, true)
        .await
        .unwrap()
        .into_iter()
        .find(|f| f.key == key)
}
