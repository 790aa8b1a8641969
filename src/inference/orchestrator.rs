//! Provider orchestration: health tracking, model selection, arbitration.

use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::endpoint::{HttpEndpoint, OfflineEndpoint};
use super::health::{resolve_model, HealthSnapshot, ProviderHealth};
use super::parse::{parse_model_output, ParsedModelOutput};
use super::{ChatMessage, ChatRequest, ModelEndpoint};
use crate::config::InferenceConfig;
use crate::extract::{rules, Extraction};

const EXTRACTION_PROMPT: &str = "You extract one fact from a short personal note. \
Reply with a single JSON object and nothing else: \
{\"subject\": string|null, \"key\": string|null, \"value\": string|null, \
\"is_question\": bool, \"confidence\": number between 0 and 1}. \
`subject` is the person, place or thing the fact is about, `key` the attribute \
(for example \"coffee\", \"birthday\", \"gate code\"), `value` what it is. \
Set is_question true when the note asks for information instead of stating it. \
Use null for anything the note does not say.";

const SUMMARY_PROMPT: &str = "Summarize the note in one short sentence. \
Keep names, numbers and codes. Reply with the sentence only.";

/// Which model to ask for, in order of preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub configured: String,
    pub fallbacks: Vec<String>,
}

impl From<&InferenceConfig> for ModelSelection {
    fn from(config: &InferenceConfig) -> Self {
        Self {
            configured: config.model.clone(),
            fallbacks: config.fallback_models.clone(),
        }
    }
}

/// Wraps one [`ModelEndpoint`] with cached health, model resolution and
/// rule/model arbitration. Cheap to share behind an `Arc`.
pub struct Orchestrator {
    endpoint: Arc<dyn ModelEndpoint>,
    selection: RwLock<ModelSelection>,
    health_tx: watch::Sender<HealthSnapshot>,
    last_checked: Mutex<Option<Instant>>,
    ttl: Duration,
    temperature: f32,
    max_tokens: u32,
}

impl Orchestrator {
    pub fn new(endpoint: Arc<dyn ModelEndpoint>, config: &InferenceConfig) -> Self {
        let (health_tx, _) = watch::channel(HealthSnapshot::default());
        Self {
            endpoint,
            selection: RwLock::new(ModelSelection::from(config)),
            health_tx,
            last_checked: Mutex::new(None),
            ttl: Duration::from_secs(config.health_ttl_secs),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// HTTP endpoint when inference is enabled, otherwise the offline stub.
    pub fn from_config(config: &InferenceConfig) -> anyhow::Result<Self> {
        let endpoint: Arc<dyn ModelEndpoint> = if config.enabled {
            Arc::new(HttpEndpoint::new(config)?)
        } else {
            tracing::info!("inference disabled; extraction is rule-only");
            Arc::new(OfflineEndpoint)
        };
        Ok(Self::new(endpoint, config))
    }

    pub fn selection(&self) -> ModelSelection {
        self.selection
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the model preference and re-check against it.
    pub async fn set_selection(&self, selection: ModelSelection) -> ProviderHealth {
        tracing::info!(model = %selection.configured, fallbacks = ?selection.fallbacks, "model selection changed");
        *self.selection.write().unwrap_or_else(|e| e.into_inner()) = selection;
        self.check_health(true).await
    }

    /// Latest snapshot without triggering a check.
    pub fn snapshot(&self) -> HealthSnapshot {
        self.health_tx.borrow().clone()
    }

    /// Observe health changes.
    pub fn subscribe(&self) -> watch::Receiver<HealthSnapshot> {
        self.health_tx.subscribe()
    }

    fn is_fresh(&self) -> bool {
        let last = *self.last_checked.lock().unwrap_or_else(|e| e.into_inner());
        last.is_some_and(|at| at.elapsed() < self.ttl)
    }

    /// Current health, from cache unless stale or `force`.
    pub async fn check_health(&self, force: bool) -> ProviderHealth {
        if !force && self.is_fresh() {
            return self.health_tx.borrow().state.clone();
        }

        let selection = self.selection();
        let state = match self.endpoint.list_models().await {
            Ok(available) => match resolve_model(&available, &selection.configured, &selection.fallbacks) {
                Some(model) => ProviderHealth::Healthy { model },
                None => ProviderHealth::DegradedNoModel { available },
            },
            Err(e) => ProviderHealth::Unreachable {
                reason: e.to_string(),
            },
        };

        *self.last_checked.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
        let previous = self.health_tx.send_replace(HealthSnapshot {
            state: state.clone(),
            checked_at: Some(crate::ledger::now()),
        });

        if previous.state != state {
            match &state {
                ProviderHealth::Healthy { model } => {
                    tracing::info!(model = %model, "inference endpoint healthy")
                }
                ProviderHealth::DegradedNoModel { available } => tracing::warn!(
                    wanted = %selection.configured,
                    available = ?available,
                    "inference endpoint serves none of the configured models"
                ),
                ProviderHealth::Unreachable { reason } => {
                    tracing::warn!(reason = %reason, "inference endpoint unreachable")
                }
                ProviderHealth::Unknown => {}
            }
        }
        state
    }

    async fn healthy_model(&self) -> Option<String> {
        self.check_health(false).await.model().map(str::to_string)
    }

    fn request(&self, model: String, system: &str, user: &str) -> ChatRequest {
        ChatRequest {
            model,
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Rules first; the model only when rules produced no complete triple
    /// and the endpoint is healthy. Never fails.
    pub async fn parse_input(&self, text: &str) -> Extraction {
        let by_rules = rules::extract(text);
        if by_rules.is_complete() {
            return by_rules;
        }
        let Some(model) = self.healthy_model().await else {
            return by_rules;
        };

        let request = self.request(model, EXTRACTION_PROMPT, text);
        match self.endpoint.chat(&request).await {
            Ok(reply) => {
                let parsed = parse_model_output(&reply);
                if parsed == ParsedModelOutput::Empty {
                    tracing::warn!(reply_len = reply.len(), "model reply had no usable JSON");
                    self.check_health(true).await;
                }
                let chosen = arbitrate(by_rules, &parsed);
                tracing::debug!(source = ?chosen.source, confidence = chosen.confidence, "extraction arbitrated");
                chosen
            }
            Err(e) => {
                tracing::warn!(error = %e, "model extraction failed; using rule result");
                self.check_health(true).await;
                by_rules
            }
        }
    }

    /// Short summary of `text`, at most `max_len` characters. Falls back to
    /// the first sentence when the model is unavailable.
    pub async fn summarize(&self, text: &str, max_len: usize) -> String {
        if let Some(model) = self.healthy_model().await {
            let request = self.request(model, SUMMARY_PROMPT, text);
            match self.endpoint.chat(&request).await {
                Ok(reply) if !reply.trim().is_empty() => {
                    return truncate(reply.trim(), max_len);
                }
                Ok(_) => {
                    tracing::warn!("model returned an empty summary");
                    self.check_health(true).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "model summary failed; using first sentence");
                    self.check_health(true).await;
                }
            }
        }
        summarize_fallback(text, max_len)
    }

    /// Re-check health every `interval` until shut down.
    pub fn spawn_health_monitor(self: &Arc<Self>, interval: Duration) -> HealthMonitor {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let orchestrator = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        orchestrator.check_health(true).await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("health monitor stopped");
        });

        HealthMonitor {
            handle: Some(handle),
            shutdown_tx,
        }
    }
}

/// Pick the model result iff it carries a complete triple at least as
/// confident as the rules, or rules found nothing and the model calls it a
/// question.
///
/// The question flag from the rules always survives: a model that calls a
/// question a statement must not turn it into a fact write.
pub fn arbitrate(by_rules: Extraction, parsed: &ParsedModelOutput) -> Extraction {
    let Some(mut by_model) = parsed.to_extraction() else {
        return by_rules;
    };
    by_model.is_question |= by_rules.is_question;

    if by_model.is_complete() && by_model.confidence >= by_rules.confidence {
        return by_model;
    }
    if !by_rules.is_complete() && by_model.is_question && by_model.confidence > 0.0 {
        return by_model;
    }
    by_rules
}

/// First sentence of `text`, cut to `max_len` characters with `...`.
pub fn summarize_fallback(text: &str, max_len: usize) -> String {
    let text = text.trim();
    let mut end = text.len();
    let mut chars = text.char_indices().peekable();
    while let Some((i, ch)) = chars.next() {
        if matches!(ch, '.' | '!' | '?') && chars.peek().is_none_or(|(_, next)| next.is_whitespace()) {
            end = i + ch.len_utf8();
            break;
        }
    }
    truncate(&text[..end], max_len)
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    // No room for an ellipsis: hard cut.
    if max_len <= 3 {
        return text.chars().take(max_len).collect();
    }
    let keep = max_len - 3;
    let cut: String = text.chars().take(keep).collect();
    format!("{}...", cut.trim_end())
}

/// Handle to the background health task. Dropping it aborts the task.
pub struct HealthMonitor {
    handle: Option<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
}

impl HealthMonitor {
    /// Stop the monitor and wait for the task to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            if tokio::time::timeout(Duration::from_secs(5), handle).await.is_err() {
                tracing::warn!("health monitor did not stop in time");
            }
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{ExtractionSource, RULE_CONFIDENCE};
    use crate::inference::InferenceError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeEndpoint {
        models: Result<Vec<String>, InferenceError>,
        reply: Result<String, InferenceError>,
        list_calls: AtomicUsize,
        chat_calls: AtomicUsize,
    }

    impl FakeEndpoint {
        fn serving(models: &[&str], reply: &str) -> Arc<Self> {
            Arc::new(Self {
                models: Ok(models.iter().map(|m| m.to_string()).collect()),
                reply: Ok(reply.to_string()),
                list_calls: AtomicUsize::new(0),
                chat_calls: AtomicUsize::new(0),
            })
        }

        fn down() -> Arc<Self> {
            Arc::new(Self {
                models: Err(InferenceError::Unavailable("connection refused".into())),
                reply: Err(InferenceError::Unavailable("connection refused".into())),
                list_calls: AtomicUsize::new(0),
                chat_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ModelEndpoint for FakeEndpoint {
        async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.models.clone()
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<String, InferenceError> {
            self.chat_calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    fn config() -> InferenceConfig {
        InferenceConfig {
            model: "llama3.2".into(),
            fallback_models: vec!["mistral".into()],
            health_ttl_secs: 60,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn rules_win_without_calling_model() {
        let fake = FakeEndpoint::serving(&["llama3.2:latest"], "{}");
        let orch = Orchestrator::new(fake.clone(), &config());

        let ext = orch.parse_input("Joe's coffee is Espresso").await;
        assert_eq!(ext.source, ExtractionSource::Rules);
        assert_eq!(ext.confidence, RULE_CONFIDENCE);
        assert_eq!(fake.chat_calls.load(Ordering::SeqCst), 0);
        assert_eq!(fake.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn model_fills_in_when_rules_defer() {
        let fake = FakeEndpoint::serving(
            &["llama3.2:latest"],
            r#"{"subject":"Sarah","key":"birthday","value":"May 3rd","is_question":false,"confidence":0.92}"#,
        );
        let orch = Orchestrator::new(fake.clone(), &config());

        let ext = orch.parse_input("Sarah was born on May 3rd").await;
        assert_eq!(ext.source, ExtractionSource::Model);
        let triple = ext.triple.unwrap();
        assert_eq!(triple.key, "birthday");
        assert_eq!(fake.chat_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            orch.snapshot().state,
            ProviderHealth::Healthy {
                model: "llama3.2:latest".into()
            }
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades_to_rules() {
        let fake = FakeEndpoint::down();
        let orch = Orchestrator::new(fake.clone(), &config());

        let ext = orch.parse_input("Sarah was born on May 3rd").await;
        assert!(ext.triple.is_none());
        assert_eq!(ext.confidence, 0.0);
        assert_eq!(fake.chat_calls.load(Ordering::SeqCst), 0);
        assert!(matches!(orch.snapshot().state, ProviderHealth::Unreachable { .. }));
    }

    #[tokio::test]
    async fn missing_model_is_degraded() {
        let fake = FakeEndpoint::serving(&["phi3"], "{}");
        let orch = Orchestrator::new(fake.clone(), &config());

        let state = orch.check_health(false).await;
        assert_eq!(
            state,
            ProviderHealth::DegradedNoModel {
                available: vec!["phi3".into()]
            }
        );
        orch.parse_input("something vague").await;
        assert_eq!(fake.chat_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn health_is_cached_within_ttl() {
        let fake = FakeEndpoint::serving(&["llama3.2"], "{}");
        let orch = Orchestrator::new(fake.clone(), &config());

        orch.check_health(false).await;
        orch.check_health(false).await;
        assert_eq!(fake.list_calls.load(Ordering::SeqCst), 1);
        orch.check_health(true).await;
        assert_eq!(fake.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unparseable_reply_forces_recheck() {
        let fake = FakeEndpoint::serving(&["llama3.2"], "I could not find a fact.");
        let orch = Orchestrator::new(fake.clone(), &config());

        let ext = orch.parse_input("hmm").await;
        assert_eq!(ext.source, ExtractionSource::None);
        // initial check plus the forced one
        assert_eq!(fake.list_calls.load(Ordering::SeqCst), 2);
        assert!(orch.snapshot().state.is_healthy());
    }

    #[tokio::test]
    async fn selection_change_forces_recheck() {
        let fake = FakeEndpoint::serving(&["mistral:7b", "phi3"], "{}");
        let orch = Orchestrator::new(fake.clone(), &config());
        assert_eq!(orch.check_health(false).await.model(), Some("mistral:7b"));

        let state = orch
            .set_selection(ModelSelection {
                configured: "phi3".into(),
                fallbacks: vec![],
            })
            .await;
        assert_eq!(state.model(), Some("phi3"));
        assert_eq!(orch.selection().configured, "phi3");
        assert_eq!(fake.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let fake = FakeEndpoint::serving(&["llama3.2"], "{}");
        let orch = Orchestrator::new(fake, &config());
        let mut rx = orch.subscribe();
        assert_eq!(rx.borrow().state, ProviderHealth::Unknown);

        orch.check_health(true).await;
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().state.is_healthy());
    }

    #[tokio::test]
    async fn monitor_runs_and_shuts_down() {
        let fake = FakeEndpoint::serving(&["llama3.2"], "{}");
        let orch = Arc::new(Orchestrator::new(fake.clone(), &config()));
        let mut rx = orch.subscribe();

        let monitor = orch.spawn_health_monitor(Duration::from_millis(10));
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();
        monitor.shutdown().await;

        let calls = fake.list_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fake.list_calls.load(Ordering::SeqCst), calls);
    }

    #[test]
    fn arbitration_rules() {
        let rules_empty = Extraction::empty(false);
        let complete = ParsedModelOutput::Parsed {
            subject: Some("Joe".into()),
            key: Some("tea".into()),
            value: Some("Green".into()),
            is_question: false,
            confidence: 0.5,
        };
        assert_eq!(arbitrate(rules_empty.clone(), &complete).source, ExtractionSource::Model);

        let rules_hit = rules::extract("Joe's coffee is Espresso");
        assert_eq!(arbitrate(rules_hit.clone(), &complete).source, ExtractionSource::Rules);

        let confident = ParsedModelOutput::Parsed {
            subject: Some("Joe".into()),
            key: Some("tea".into()),
            value: Some("Green".into()),
            is_question: false,
            confidence: 0.95,
        };
        assert_eq!(arbitrate(rules_hit, &confident).source, ExtractionSource::Model);

        let question = ParsedModelOutput::Parsed {
            subject: None,
            key: None,
            value: None,
            is_question: true,
            confidence: 0.4,
        };
        let picked = arbitrate(rules_empty.clone(), &question);
        assert!(picked.is_question);
        assert_eq!(picked.source, ExtractionSource::Model);

        let unsure = ParsedModelOutput::Parsed {
            subject: None,
            key: None,
            value: None,
            is_question: true,
            confidence: 0.0,
        };
        assert_eq!(arbitrate(rules_empty.clone(), &unsure).source, ExtractionSource::None);
        assert_eq!(arbitrate(rules_empty, &ParsedModelOutput::Empty).source, ExtractionSource::None);
    }

    #[test]
    fn fallback_summary() {
        assert_eq!(
            summarize_fallback("Gate code is 1234. Lot closes at nine.", 80),
            "Gate code is 1234."
        );
        assert_eq!(summarize_fallback("Version 1.2 shipped today", 80), "Version 1.2 shipped today");
        assert_eq!(summarize_fallback("abcdefghijklmnop", 10), "abcdefg...");
        assert_eq!(summarize_fallback("abcdefghijklmnop", 10).chars().count(), 10);
    }

    #[test]
    fn tiny_limits_never_overflow() {
        for max in 0..=3 {
            let summary = summarize_fallback("abcdefghijklmnop", max);
            assert_eq!(summary.chars().count(), max, "max_len {max}");
            assert!(!summary.contains("..."));
        }
        assert_eq!(summarize_fallback("abcdefghijklmnop", 4), "a...");
    }

    #[test]
    fn model_cannot_unflag_a_question() {
        let by_rules = rules::extract("What is Joe's coffee?");
        assert!(by_rules.is_question);
        let statement = ParsedModelOutput::Parsed {
            subject: Some("Joe".into()),
            key: Some("coffee".into()),
            value: Some("Mocha".into()),
            is_question: false,
            confidence: 0.8,
        };

        let picked = arbitrate(by_rules, &statement);

        assert_eq!(picked.source, ExtractionSource::Model);
        assert!(picked.is_question);
    }

    #[tokio::test]
    async fn question_stays_a_question_through_the_model() {
        let fake = FakeEndpoint::serving(
            &["llama3.2"],
            r#"{"subject":"Joe","key":"coffee","value":"Mocha","is_question":false,"confidence":0.8}"#,
        );
        let orch = Orchestrator::new(fake.clone(), &config());

        let ext = orch.parse_input("What is Joe's coffee?").await;

        assert!(ext.is_question);
        assert_eq!(fake.chat_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn summarize_uses_model_when_healthy() {
        let fake = FakeEndpoint::serving(&["llama3.2"], "  Railroad gate code.  ");
        let orch = Orchestrator::new(fake, &config());
        assert_eq!(
            orch.summarize("The gate code for Railroad is 1234, and more.", 80).await,
            "Railroad gate code."
        );

        let orch = Orchestrator::new(FakeEndpoint::down(), &config());
        assert_eq!(orch.summarize("First. Second.", 80).await, "First.");
    }
}
