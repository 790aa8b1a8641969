pub mod attribute_history;
pub mod forget_attribute;
pub mod get_attributes;
pub mod inference_health;
pub mod recent_entries;
pub mod search_ledger;
pub mod summon;

use attribute_history::AttributeHistoryParams;
use forget_attribute::ForgetAttributeParams;
use get_attributes::GetAttributesParams;
use inference_health::InferenceHealthParams;
use recent_entries::RecentEntriesParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use search_ledger::SearchLedgerParams;
use summon::SummonParams;

use dojo::ledger::types::SummoningMetadata;
use dojo::summon::Summoner;
use dojo::uri::Uri;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

/// The Dojo MCP tool handler. Wraps one shared [`Summoner`] and exposes the
/// pipeline via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct DojoTools {
    tool_router: ToolRouter<Self>,
    summoner: Summoner,
}

fn clamp_limit(limit: Option<usize>) -> Result<usize, String> {
    match limit.unwrap_or(DEFAULT_LIMIT) {
        0 => Err("limit must be at least 1".into()),
        n => Ok(n.min(MAX_LIMIT)),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialization failed: {e}"))
}

#[tool_router]
impl DojoTools {
    pub fn new(summoner: Summoner) -> Self {
        Self {
            tool_router: Self::tool_router(),
            summoner,
        }
    }

    async fn subject(&self, subject: &str) -> Result<Uri, String> {
        self.summoner
            .resolve_subject(subject)
            .await
            .map_err(|e| format!("subject lookup failed: {e}"))?
            .ok_or_else(|| format!("no subject matches \"{subject}\""))
    }

    /// Summon free text: store the fact it states, or answer the question it asks.
    #[tool(description = "Summon free text into the ledger. Statements like \"Joe's coffee is Espresso\" are stored as audited facts; questions like \"What is Joe's coffee?\" are answered from stored facts. Every call is logged.")]
    async fn summon(
        &self,
        Parameters(params): Parameters<SummonParams>,
    ) -> Result<String, String> {
        if params.text.trim().is_empty() {
            return Err("text must not be empty".into());
        }
        if let Some(c) = params.confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err("confidence must be between 0.0 and 1.0".into());
            }
        }

        tracing::info!(text_len = params.text.len(), "summon called");

        let metadata = SummoningMetadata {
            location: params.location,
            weather: params.weather,
            source_id: params.source_id,
            trigger: params.trigger.or_else(|| Some("mcp".into())),
            confidence: params.confidence,
            device_id: params.device_id,
        };

        let outcome = self
            .summoner
            .process_summoning(&params.text, metadata)
            .await
            .map_err(|e| format!("summon failed: {e}"))?;

        tracing::info!(
            id = %outcome.ledger_entry.id,
            kind = %outcome.ledger_entry.kind,
            stored = outcome.vault_entry.is_some(),
            "summoning processed"
        );

        to_json(&outcome)
    }

    /// Soft-delete one fact.
    #[tool(description = "Forget one fact about a subject. The value is cleared but the key and a receipt pointing at the deletion stay, so the history remains auditable.")]
    async fn forget_attribute(
        &self,
        Parameters(params): Parameters<ForgetAttributeParams>,
    ) -> Result<String, String> {
        tracing::info!(subject = %params.subject, key = %params.key, "forget_attribute called");
        let uri = self.subject(&params.subject).await?;
        let entry = self
            .summoner
            .delete_attribute(&uri, &params.key)
            .await
            .map_err(|e| format!("forget failed: {e}"))?;
        to_json(&entry)
    }

    #[tool(description = "List the stored facts about a subject, optionally including forgotten ones.")]
    async fn get_attributes(
        &self,
        Parameters(params): Parameters<GetAttributesParams>,
    ) -> Result<String, String> {
        let uri = self.subject(&params.subject).await?;
        let facts = self
            .summoner
            .get_attributes(&uri, params.include_deleted.unwrap_or(false))
            .await
            .map_err(|e| format!("lookup failed: {e}"))?;
        to_json(&serde_json::json!({
            "uri": uri,
            "attributes": facts,
        }))
    }

    #[tool(description = "Show every change to one fact, oldest first, with the text that caused each change.")]
    async fn attribute_history(
        &self,
        Parameters(params): Parameters<AttributeHistoryParams>,
    ) -> Result<String, String> {
        let uri = self.subject(&params.subject).await?;
        let history = self
            .summoner
            .get_attribute_history(&uri, &params.key)
            .await
            .map_err(|e| format!("history lookup failed: {e}"))?;
        to_json(&serde_json::json!({
            "uri": uri,
            "key": dojo::uri::normalize(&params.key),
            "history": history,
        }))
    }

    #[tool(description = "List the most recent ledger entries, newest first.")]
    async fn recent_entries(
        &self,
        Parameters(params): Parameters<RecentEntriesParams>,
    ) -> Result<String, String> {
        let limit = clamp_limit(params.limit)?;
        let entries = self
            .summoner
            .get_recent_ledger_entries(limit)
            .await
            .map_err(|e| format!("ledger read failed: {e}"))?;
        to_json(&entries)
    }

    #[tool(description = "Substring search over ledger text, subject names, fact keys and fact values.")]
    async fn search_ledger(
        &self,
        Parameters(params): Parameters<SearchLedgerParams>,
    ) -> Result<String, String> {
        if params.query.trim().is_empty() {
            return Err("query must not be empty".into());
        }
        let limit = clamp_limit(params.limit)?;
        let hits = self
            .summoner
            .search(&params.query, limit)
            .await
            .map_err(|e| format!("search failed: {e}"))?;
        to_json(&hits)
    }

    #[tool(description = "Report whether the inference endpoint is reachable and which model it would use.")]
    async fn inference_health(
        &self,
        Parameters(params): Parameters<InferenceHealthParams>,
    ) -> Result<String, String> {
        let state = self.summoner.health(params.force.unwrap_or(false)).await;
        let selection = self.summoner.orchestrator().selection();
        to_json(&serde_json::json!({
            "health": state,
            "configured_model": selection.configured,
            "fallback_models": selection.fallbacks,
        }))
    }
}

#[tool_handler]
impl ServerHandler for DojoTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Dojo is a personal fact ledger. Use summon to store statements or ask \
                 questions, get_attributes and attribute_history to inspect what is known, \
                 and forget_attribute to remove a fact."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped() {
        assert_eq!(clamp_limit(None), Ok(DEFAULT_LIMIT));
        assert_eq!(clamp_limit(Some(5)), Ok(5));
        assert_eq!(clamp_limit(Some(10_000)), Ok(MAX_LIMIT));
        assert!(clamp_limit(Some(0)).is_err());
    }
}
