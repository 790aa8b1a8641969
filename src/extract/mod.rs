//! Fact extraction from free text.
//!
//! [`rules::extract`] is the deterministic first pass every summoning goes
//! through; the model-assisted pass in [`crate::inference`] only runs when it
//! comes back without a complete [`Triple`]. [`pairs::extract_all_pairs`] is a
//! looser scanner kept off the write path.

pub mod pairs;
pub mod rules;

use serde::Serialize;

use crate::uri::{self, Uri};

/// Confidence assigned to any rule match.
pub const RULE_CONFIDENCE: f64 = 0.9;

/// One (subject, attribute, value) fact, with the subject already addressed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Triple {
    /// Subject as the user wrote it, used as the registry display name.
    pub subject: String,
    pub uri: Uri,
    /// Normalized attribute key, e.g. `gate_code`.
    pub key: String,
    pub value: String,
}

impl Triple {
    /// Clean up raw captures and address the subject. `None` when any part
    /// is empty after cleanup or the subject cannot be turned into a slug.
    pub fn new(subject: &str, key: &str, value: &str) -> Option<Self> {
        let subject = clean_capture(subject);
        let value = clean_capture(value);
        let key = uri::normalize(key);
        if subject.is_empty() || value.is_empty() || key.is_empty() {
            return None;
        }
        let uri = Uri::resolve(&subject, &key).ok()?;
        Some(Self {
            subject,
            uri,
            key,
            value,
        })
    }
}

/// Where an [`Extraction`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    Rules,
    Model,
    None,
}

/// Result of running an extractor over one summoning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triple: Option<Triple>,
    pub is_question: bool,
    pub confidence: f64,
    pub source: ExtractionSource,
    /// Name of the rule that fired, for rule extractions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<&'static str>,
}

impl Extraction {
    /// Zero-confidence result carrying only the question flag.
    pub fn empty(is_question: bool) -> Self {
        Self {
            triple: None,
            is_question,
            confidence: 0.0,
            source: ExtractionSource::None,
            rule: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.triple.is_some()
    }
}

const INTERROGATIVES: &[&str] = &[
    "what", "what's", "whats", "who", "who's", "whos", "whom", "whose", "where", "where's",
    "wheres", "when", "why", "how", "which",
];

const QUESTION_PREFIXES: &[&str] = &["tell me about ", "do you know "];

/// Question classification, independent of triple extraction: a leading
/// interrogative or a trailing `?`.
pub fn is_question(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.ends_with('?') {
        return true;
    }
    let lower = trimmed.to_lowercase().replace('\u{2019}', "'");
    if QUESTION_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return true;
    }
    lower
        .split_whitespace()
        .next()
        .map(|w| w.trim_end_matches([',', ':']))
        .is_some_and(|w| INTERROGATIVES.contains(&w))
}

/// Trim whitespace, wrapping quotes and trailing sentence punctuation.
pub(crate) fn clean_capture(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(['.', '!', '?', ','])
        .trim()
        .trim_matches(['"', '\'', '`'])
        .trim()
        .to_string()
}
