//! Record types for the three ledger tables.
//!
//! [`LedgerEntry`] is the immutable interaction log, [`RegistryEntry`] the
//! current-state projection per identifier, [`VaultEntry`] one audited fact.

use serde::{Deserialize, Serialize};

/// What kind of interaction a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// A statement the user summoned.
    StatementInput,
    /// A question the user asked.
    QuestionRequest,
    /// Something the system derived, e.g. a summary.
    DerivedSynthesis,
}

impl LedgerKind {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatementInput => "statement_input",
            Self::QuestionRequest => "question_request",
            Self::DerivedSynthesis => "derived_synthesis",
        }
    }
}

impl std::fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LedgerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "statement_input" => Ok(Self::StatementInput),
            "question_request" => Ok(Self::QuestionRequest),
            "derived_synthesis" => Ok(Self::DerivedSynthesis),
            _ => Err(format!("unknown ledger kind: {s}")),
        }
    }
}

/// Caller-supplied context for a summoning. Persisted verbatim, never interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummoningMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    /// Id of the message/call/etc. the text came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// One row of the `ledger` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    pub kind: LedgerKind,
    /// The summoned text, or its summary once ghosted.
    pub raw_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub metadata: SummoningMetadata,
    /// RFC 3339 UTC creation timestamp.
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ghosted_at: Option<String>,
}

/// One row of the `registry` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub uri: String,
    pub display_name: String,
    /// Open-ended JSON bag.
    pub payload: serde_json::Value,
    /// Ledger entry that last touched this subject.
    pub last_ledger_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// One row of the `vault` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultEntry {
    pub uri: String,
    pub key: String,
    /// `None` once soft-deleted.
    pub value: Option<String>,
    /// Audit receipt: the ledger entry that produced the current state.
    pub audit_ledger_id: String,
    pub sensitive: bool,
    pub updated_at: String,
}

impl VaultEntry {
    pub fn is_deleted(&self) -> bool {
        self.value.is_none()
    }
}

/// One mutation of a fact, joined with the text that caused it.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    /// `"set"` or `"delete"`.
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub ledger_id: String,
    /// Raw text of the originating ledger entry; `None` means origin unknown.
    pub origin_text: Option<String>,
    pub created_at: String,
}

/// Result of applying one extracted triple.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedFact {
    pub registry: RegistryEntry,
    pub vault: VaultEntry,
    /// `true` if this fact introduced a new subject.
    pub created_registry: bool,
}
