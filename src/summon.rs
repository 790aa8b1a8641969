//! The summoning pipeline: text in, audited facts and answers out.
//!
//! [`Summoner`] ties extraction, the store and the query resolver together.
//! SQLite work runs on the blocking pool behind one shared connection, the
//! same way the MCP tools reach the database.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use serde::Serialize;

use crate::config::QueryConfig;
use crate::extract::{Extraction, Triple};
use crate::inference::{Orchestrator, ProviderHealth};
use crate::ledger::search::SearchHits;
use crate::ledger::types::{
    HistoryEntry, LedgerEntry, LedgerKind, RegistryEntry, SummoningMetadata, VaultEntry,
};
use crate::ledger::{entries, registry, search, vault};
use crate::query::{self, humanize_key, QueryAnswer};
use crate::uri::{self, Uri};

/// Everything one summoning produced.
#[derive(Debug, Clone, Serialize)]
pub struct SummoningOutcome {
    pub ledger_entry: LedgerEntry,
    pub extraction: Extraction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_entry: Option<RegistryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_entry: Option<VaultEntry>,
    pub created_new_registry_entry: bool,
    /// One line for the user: the answer, the stored fact, or why nothing was stored.
    pub message: String,
}

#[derive(Clone)]
pub struct Summoner {
    db: Arc<Mutex<Connection>>,
    orchestrator: Arc<Orchestrator>,
    query: QueryConfig,
}

impl Summoner {
    pub fn new(db: Arc<Mutex<Connection>>, orchestrator: Arc<Orchestrator>, query: QueryConfig) -> Self {
        Self {
            db,
            orchestrator,
            query,
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            f(&mut conn)
        })
        .await
        .context("db task failed")?
    }

    /// Run one summoning end to end.
    ///
    /// Questions are answered from stored facts and logged as
    /// `question_request` entries; they never write facts. Statements always
    /// get a `statement_input` entry, and a complete extraction is applied
    /// under that entry's id. Extraction and model failures never make this
    /// fail; only storage errors do.
    pub async fn process_summoning(
        &self,
        text: &str,
        mut metadata: SummoningMetadata,
    ) -> Result<SummoningOutcome> {
        let text = text.trim().to_string();
        if text.is_empty() {
            bail!("summoning text must not be empty");
        }

        let extraction = self.orchestrator.parse_input(&text).await;
        metadata.confidence.get_or_insert(extraction.confidence);

        tracing::info!(
            text_len = text.len(),
            is_question = extraction.is_question,
            source = ?extraction.source,
            rule = extraction.rule.unwrap_or("-"),
            "summoning received"
        );

        if extraction.is_question {
            let config = self.query.clone();
            return self
                .with_db(move |conn| {
                    let answer = query::answer_question(conn, &text, &config)?;
                    let target = answer.subject_uri.as_deref().and_then(uri::parse);
                    let ledger_entry = entries::record_summoning(
                        conn,
                        &text,
                        LedgerKind::QuestionRequest,
                        target.as_ref(),
                        None,
                        &metadata,
                    )?;
                    Ok(SummoningOutcome {
                        ledger_entry,
                        extraction,
                        registry_entry: None,
                        vault_entry: None,
                        created_new_registry_entry: false,
                        message: answer.message,
                    })
                })
                .await;
        }

        self.with_db(move |conn| {
            let mut extraction = extraction;
            if let Some(triple) = extraction.triple.as_mut() {
                readdress(conn, triple)?;
            }
            let target = extraction.triple.as_ref().map(|t| t.uri.clone());
            let ledger_entry = entries::record_summoning(
                conn,
                &text,
                LedgerKind::StatementInput,
                target.as_ref(),
                None,
                &metadata,
            )?;

            let mut outcome = SummoningOutcome {
                ledger_entry,
                extraction,
                registry_entry: None,
                vault_entry: None,
                created_new_registry_entry: false,
                message: format!("Unable to extract a fact from \"{text}\". Saved it to the ledger."),
            };

            if let Some(triple) = outcome.extraction.triple.clone() {
                match vault::apply_extraction(conn, &triple, &outcome.ledger_entry.id) {
                    Ok(applied) => {
                        outcome.message = format!(
                            "Saved {}'s {} as {}.",
                            applied.registry.display_name,
                            humanize_key(&triple.key),
                            triple.value
                        );
                        outcome.created_new_registry_entry = applied.created_registry;
                        outcome.registry_entry = Some(applied.registry);
                        outcome.vault_entry = Some(applied.vault);
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            ledger_id = %outcome.ledger_entry.id,
                            "fact extracted but not stored"
                        );
                        outcome.message =
                            format!("Saved to the ledger, but could not store the fact: {e}");
                    }
                }
            }
            Ok(outcome)
        })
        .await
    }

    /// Soft-delete one fact under a new ledger entry that records the deletion.
    pub async fn delete_attribute(&self, uri: &Uri, key: &str) -> Result<VaultEntry> {
        let uri = uri.clone();
        let key = uri::normalize(key);
        self.with_db(move |conn| {
            if vault::get_attribute(conn, &uri, &key)?.is_none() {
                bail!("attribute not found: {uri} / {key}");
            }
            let metadata = SummoningMetadata {
                trigger: Some("delete".into()),
                ..Default::default()
            };
            let entry = entries::record_summoning(
                conn,
                &format!("forget {key} for {uri}"),
                LedgerKind::StatementInput,
                Some(&uri),
                None,
                &metadata,
            )?;
            vault::soft_delete(conn, &uri, &key, &entry.id)
        })
        .await
    }

    pub async fn get_attributes(&self, uri: &Uri, include_deleted: bool) -> Result<Vec<VaultEntry>> {
        let uri = uri.clone();
        self.with_db(move |conn| vault::get_by_uri(conn, &uri, include_deleted))
            .await
    }

    pub async fn get_attribute_history(&self, uri: &Uri, key: &str) -> Result<Vec<HistoryEntry>> {
        let uri = uri.clone();
        let key = uri::normalize(key);
        self.with_db(move |conn| vault::attribute_history(conn, &uri, &key))
            .await
    }

    pub async fn get_record(&self, uri: &Uri) -> Result<Option<RegistryEntry>> {
        let uri = uri.clone();
        self.with_db(move |conn| registry::get_record(conn, &uri))
            .await
    }

    pub async fn get_ledger_entry(&self, id: &str) -> Result<Option<LedgerEntry>> {
        let id = id.to_string();
        self.with_db(move |conn| entries::get_entry(conn, &id))
            .await
    }

    pub async fn get_recent_ledger_entries(&self, limit: usize) -> Result<Vec<LedgerEntry>> {
        self.with_db(move |conn| entries::recent_entries(conn, limit))
            .await
    }

    pub async fn search(&self, needle: &str, limit: usize) -> Result<SearchHits> {
        let needle = needle.to_string();
        self.with_db(move |conn| search::search(conn, &needle, limit))
            .await
    }

    /// A full identifier as given, otherwise the subject a display name
    /// resolves to.
    pub async fn resolve_subject(&self, subject: &str) -> Result<Option<Uri>> {
        if let Some(uri) = uri::parse(subject.trim()) {
            return Ok(Some(uri));
        }
        let name = subject.to_string();
        self.with_db(move |conn| Ok(query::resolve_subject(conn, &name, "")?.map(|s| s.uri)))
            .await
    }

    /// Answer a question without logging it.
    pub async fn ask(&self, text: &str) -> Result<QueryAnswer> {
        let text = text.to_string();
        let config = self.query.clone();
        self.with_db(move |conn| query::answer_question(conn, &text, &config))
            .await
    }

    /// Compact a ledger entry's text into a summary of at most `max_len`
    /// characters. The entry keeps its id, kind, target and timestamp.
    pub async fn ghost(&self, id: &str, max_len: usize) -> Result<LedgerEntry> {
        let lookup = id.to_string();
        let Some(entry) = self
            .with_db(move |conn| entries::get_entry(conn, &lookup))
            .await?
        else {
            bail!("ledger entry not found: {id}");
        };

        let summary = self.orchestrator.summarize(&entry.raw_text, max_len).await;
        let id = entry.id;
        self.with_db(move |conn| entries::ghost_entry(conn, &id, &summary))
            .await
    }

    pub async fn health(&self, force: bool) -> ProviderHealth {
        self.orchestrator.check_health(force).await
    }
}

/// Point a triple at an already-registered subject with the same display
/// name, so "Railroad" keeps one identifier whatever keys are stored for it.
/// Subjects written as full identifiers are left alone.
fn readdress(conn: &Connection, triple: &mut Triple) -> Result<()> {
    if uri::parse(&triple.subject).is_some() {
        return Ok(());
    }
    if let Some(existing) = query::find_exact_subject(conn, &triple.subject)? {
        if existing.uri != triple.uri {
            tracing::debug!(inferred = %triple.uri, existing = %existing.uri, "subject re-addressed");
            triple.uri = existing.uri;
        }
    }
    Ok(())
}
