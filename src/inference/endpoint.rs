use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{ChatRequest, InferenceError, ModelEndpoint};
use crate::config::InferenceConfig;

/// OpenAI-compatible HTTP endpoint (`/models`, `/chat/completions`).
///
/// Works against Ollama's `/v1` surface, llama.cpp server, vLLM and hosted
/// OpenAI-style APIs. Each call carries its own timeout; a timeout is
/// reported like any other connection failure.
pub struct HttpEndpoint {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    request_timeout: Duration,
    health_timeout: Duration,
}

impl HttpEndpoint {
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .build()
            .map_err(|e| InferenceError::Request(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            health_timeout: Duration::from_secs(config.health_timeout_secs),
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<Value, InferenceError> {
        let resp = self
            .authorize(builder)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| self.classify(e, timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<Value>()
            .await
            .map_err(|e| InferenceError::Parse(format!("endpoint returned invalid JSON: {e}")))
    }

    fn classify(&self, err: reqwest::Error, timeout: Duration) -> InferenceError {
        if err.is_timeout() {
            InferenceError::Timeout {
                timeout_secs: timeout.as_secs(),
            }
        } else if err.is_connect() {
            InferenceError::Unavailable(format!("{} ({err})", self.base_url))
        } else {
            InferenceError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl ModelEndpoint for HttpEndpoint {
    async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        let url = format!("{}/models", self.base_url);
        let body = self.send(self.client.get(&url), self.health_timeout).await?;
        Ok(parse_model_list(&body))
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, InferenceError> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": false,
        });
        let body = self
            .send(self.client.post(&url).json(&payload), self.request_timeout)
            .await?;

        extract_content(&body)
            .ok_or_else(|| InferenceError::Parse("response has no choices[0].message.content".into()))
    }
}

/// Stand-in endpoint used when inference is disabled. Every call fails, so
/// the orchestrator settles on `Unreachable` and never issues a request.
pub struct OfflineEndpoint;

#[async_trait]
impl ModelEndpoint for OfflineEndpoint {
    async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        Err(InferenceError::Unavailable("inference disabled".into()))
    }

    async fn chat(&self, _request: &ChatRequest) -> Result<String, InferenceError> {
        Err(InferenceError::Unavailable("inference disabled".into()))
    }
}

/// Model names from a `/models` body. Accepts `{"data":[{"id"}]}`, Ollama's
/// `{"models":[{"name"}]}` and a bare array of objects or strings.
pub(crate) fn parse_model_list(body: &Value) -> Vec<String> {
    let items = body
        .get("data")
        .or_else(|| body.get("models"))
        .unwrap_or(body)
        .as_array()
        .cloned()
        .unwrap_or_default();

    items
        .iter()
        .filter_map(|item| {
            item.as_str()
                .or_else(|| item.get("id").and_then(Value::as_str))
                .or_else(|| item.get("name").and_then(Value::as_str))
                .or_else(|| item.get("model").and_then(Value::as_str))
                .map(str::to_string)
        })
        .collect()
}

/// `choices[0].message.content`, either a string or a list of text parts.
pub(crate) fn extract_content(body: &Value) -> Option<String> {
    let content = body.get("choices")?.get(0)?.get("message")?.get("content")?;
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let text: String = parts
                .iter()
                .filter_map(|p| {
                    p.as_str()
                        .or_else(|| p.get("text").and_then(Value::as_str))
                })
                .collect();
            Some(text)
        }
        _ => None,
    }
}
