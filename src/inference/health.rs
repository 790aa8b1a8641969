//! Provider health state and model resolution.

use serde::Serialize;

/// What the orchestrator last learned about the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProviderHealth {
    /// Never checked.
    Unknown,
    /// Reachable and serving `model`, the name requests will use.
    Healthy { model: String },
    /// Reachable, but none of the configured models is served.
    DegradedNoModel { available: Vec<String> },
    Unreachable { reason: String },
}

impl ProviderHealth {
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::Healthy { model } => Some(model),
            _ => None,
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Healthy { .. } => "healthy",
            Self::DegradedNoModel { .. } => "degraded_no_model",
            Self::Unreachable { .. } => "unreachable",
        }
    }
}

/// Value carried on the health watch channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub state: ProviderHealth,
    /// RFC 3339 time of the check; `None` while `Unknown`.
    pub checked_at: Option<String>,
}

impl Default for HealthSnapshot {
    fn default() -> Self {
        Self {
            state: ProviderHealth::Unknown,
            checked_at: None,
        }
    }
}

/// Whether `served` satisfies the requested name: exact, or the requested
/// name plus a `:tag` (`llama3.2` matches `llama3.2:latest`).
pub fn model_matches(served: &str, requested: &str) -> bool {
    served == requested
        || served
            .strip_prefix(requested)
            .is_some_and(|rest| rest.starts_with(':'))
}

/// First of `configured` then `fallbacks` that the endpoint serves. Returns
/// the served name so requests use exactly what the endpoint listed.
pub fn resolve_model(available: &[String], configured: &str, fallbacks: &[String]) -> Option<String> {
    std::iter::once(configured)
        .chain(fallbacks.iter().map(String::as_str))
        .filter(|wanted| !wanted.is_empty())
        .find_map(|wanted| {
            available
                .iter()
                .find(|served| served.as_str() == wanted)
                .or_else(|| available.iter().find(|served| model_matches(served, wanted)))
                .cloned()
        })
}
