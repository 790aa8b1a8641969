//! Defensive parsing of model output.
//!
//! Models wrap JSON in prose or code fences often enough that a strict
//! `serde_json::from_str` is not sufficient. Three attempts are made in order:
//! the whole reply, the first fenced code block, the first brace-delimited
//! object. Anything else is [`ParsedModelOutput::Empty`].

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::extract::{Extraction, ExtractionSource, Triple};

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[a-zA-Z]*\s*(.*?)```").expect("fence pattern must compile")
});

/// What the model said about one summoning.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedModelOutput {
    Parsed {
        subject: Option<String>,
        key: Option<String>,
        value: Option<String>,
        is_question: bool,
        confidence: f64,
    },
    Empty,
}

#[derive(Deserialize)]
struct RawOutput {
    subject: Option<Value>,
    #[serde(alias = "attribute", alias = "predicate")]
    key: Option<Value>,
    #[serde(alias = "object")]
    value: Option<Value>,
    #[serde(default)]
    is_question: Option<bool>,
    #[serde(default)]
    confidence: Option<f64>,
}

fn scalar_text(v: Option<Value>) -> Option<String> {
    let text = match v? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn try_object(candidate: &str) -> Option<ParsedModelOutput> {
    let raw: RawOutput = serde_json::from_str(candidate.trim()).ok()?;
    Some(ParsedModelOutput::Parsed {
        subject: scalar_text(raw.subject),
        key: scalar_text(raw.key),
        value: scalar_text(raw.value),
        is_question: raw.is_question.unwrap_or(false),
        confidence: raw.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
    })
}

/// First `{ ... }` span with balanced braces, ignoring braces inside strings.
fn first_brace_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

pub fn parse_model_output(raw: &str) -> ParsedModelOutput {
    if let Some(parsed) = try_object(raw) {
        return parsed;
    }
    if let Some(parsed) = FENCED_BLOCK
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| try_object(m.as_str()))
    {
        return parsed;
    }
    first_brace_object(raw)
        .and_then(try_object)
        .unwrap_or(ParsedModelOutput::Empty)
}

impl ParsedModelOutput {
    /// As an [`Extraction`] from the model. The triple is present only when
    /// all three parts survive cleanup.
    pub fn to_extraction(&self) -> Option<Extraction> {
        match self {
            Self::Empty => None,
            Self::Parsed {
                subject,
                key,
                value,
                is_question,
                confidence,
            } => {
                let triple = match (subject, key, value) {
                    (Some(s), Some(k), Some(v)) => Triple::new(s, k, v),
                    _ => None,
                };
                Some(Extraction {
                    triple,
                    is_question: *is_question,
                    confidence: *confidence,
                    source: ExtractionSource::Model,
                    rule: None,
                })
            }
        }
    }
}
