//! Model-assisted extraction against an OpenAI-compatible endpoint.
//!
//! The model is optional: [`orchestrator::Orchestrator`] only consults it
//! when the rule pass comes back without a complete triple and the endpoint
//! is known to serve a usable model. Every failure here degrades to the
//! rule result; nothing in this module can fail a summoning.

pub mod endpoint;
pub mod health;
pub mod orchestrator;
pub mod parse;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use endpoint::{HttpEndpoint, OfflineEndpoint};
pub use health::{HealthSnapshot, ProviderHealth};
pub use orchestrator::{HealthMonitor, ModelSelection, Orchestrator};
pub use parse::ParsedModelOutput;

/// Errors from talking to the inference endpoint.
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("inference endpoint unavailable: {0}")]
    Unavailable(String),

    #[error("inference request failed: {0}")]
    Request(String),

    #[error("inference request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("inference endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse inference response: {0}")]
    Parse(String),
}

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`.
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Non-streaming chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// The seam between the orchestrator and whatever serves the model.
#[async_trait]
pub trait ModelEndpoint: Send + Sync {
    /// Model names the endpoint currently serves.
    async fn list_models(&self) -> Result<Vec<String>, InferenceError>;

    /// Run one completion and return the assistant text.
    async fn chat(&self, request: &ChatRequest) -> Result<String, InferenceError>;
}
