//! Natural-language question answering over the vault.
//!
//! A question is classified into a [`QueryIntent`], the subject is resolved
//! against the registry, the attribute against the subject's live facts, and
//! the result is phrased as one sentence. Every path ends in a message the
//! user can act on; nothing here returns "not found" as an error.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use rusqlite::Connection;
use serde::Serialize;

use crate::config::QueryConfig;
use crate::ledger::types::{RegistryEntry, VaultEntry};
use crate::ledger::{registry, vault};
use crate::uri::{self, Uri};

pub const FORMAT_HINT: &str =
    "I heard your question but need a format like \"What is Joe's coffee?\"";

const WHAT_IS: &str = r"(?:what\s+is|what's|whats|what\s+are|when\s+is|when's|where\s+is|where's|who\s+is|who's|how\s+is)";

static POSSESSIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^{WHAT_IS}\s+(.+?)'s?\s+(.+)$")).expect("possessive query pattern must compile")
});

static FOR_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^{WHAT_IS}\s+(?:the\s+|my\s+)?(.+?)\s+(?:for|of)\s+(.+)$"))
        .expect("for-form query pattern must compile")
});

static PROFILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:who\s+is|who's|whos|where\s+is|where's|tell\s+me\s+about|what\s+do\s+you\s+know\s+about|do\s+you\s+know)\s+(.+)$",
    )
    .expect("profile query pattern must compile")
});

static GLOBAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:what\s+is|what's|whats|what\s+are)\s+(?:the\s+|my\s+)?(.+)$")
        .expect("global query pattern must compile")
});

/// What a question is asking for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum QueryIntent {
    /// "What is Joe's coffee"
    Possessive { subject: String, key: String },
    /// "What is the gate code for Railroad"
    ForForm { subject: String, key: String },
    /// "Who is Joe", "Tell me about Joe"
    Profile { subject: String },
    /// "What is coffee"
    Global { key: String },
    Unrecognized,
}

/// Answer to one question plus what it resolved to.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    pub message: String,
    pub intent: QueryIntent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl QueryAnswer {
    fn message(intent: QueryIntent, message: String) -> Self {
        Self {
            message,
            intent,
            subject_uri: None,
            key: None,
            value: None,
        }
    }
}

/// A resolved subject.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub uri: Uri,
    pub display_name: String,
}

fn strip_question(text: &str) -> String {
    text.trim()
        .replace(['\u{2019}', '\u{2018}'], "'")
        .trim_end_matches(['?', '.', '!'])
        .trim()
        .to_string()
}

fn clean(capture: &str) -> String {
    capture
        .trim()
        .trim_matches(['"', '\''])
        .trim()
        .to_string()
}

pub fn classify(text: &str) -> QueryIntent {
    let text = strip_question(text);

    if let Some(c) = POSSESSIVE.captures(&text) {
        return QueryIntent::Possessive {
            subject: clean(&c[1]),
            key: clean(&c[2]),
        };
    }
    if let Some(c) = FOR_FORM.captures(&text) {
        return QueryIntent::ForForm {
            subject: clean(&c[2]),
            key: clean(&c[1]),
        };
    }
    if let Some(c) = PROFILE.captures(&text) {
        return QueryIntent::Profile {
            subject: clean(&c[1]),
        };
    }
    if let Some(c) = GLOBAL.captures(&text) {
        return QueryIntent::Global { key: clean(&c[1]) };
    }
    QueryIntent::Unrecognized
}

/// `gate_code` -> `Gate Code`.
pub fn humanize_key(key: &str) -> String {
    key.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn to_subject(record: RegistryEntry) -> Option<Subject> {
    uri::parse(&record.uri).map(|uri| Subject {
        uri,
        display_name: record.display_name,
    })
}

/// The registered subject whose display name is exactly `name`, ignoring case.
pub fn find_exact_subject(conn: &Connection, name: &str) -> Result<Option<Subject>> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    Ok(registry::find_by_display_name(conn, name)?.and_then(to_subject))
}

/// Find the subject a name refers to.
///
/// Order: exact case-insensitive display-name match, then the identifier
/// inferred from the name (with `context` steering the namespace) if
/// anything is stored under it, then the most recent fuzzy registry hit.
pub fn resolve_subject(conn: &Connection, name: &str, context: &str) -> Result<Option<Subject>> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }

    if let Some(exact) = find_exact_subject(conn, name)? {
        return Ok(Some(exact));
    }

    let mut candidates = Vec::new();
    if let Ok(inferred) = Uri::resolve(name, context) {
        candidates.push(inferred);
    }
    if let Ok(plain) = Uri::resolve(name, "") {
        if !candidates.contains(&plain) {
            candidates.push(plain);
        }
    }
    for candidate in candidates {
        if let Some(record) = registry::get_record(conn, &candidate)? {
            return Ok(Some(Subject {
                uri: candidate,
                display_name: record.display_name,
            }));
        }
        if vault::has_facts(conn, &candidate)? {
            return Ok(Some(Subject {
                display_name: name.to_string(),
                uri: candidate,
            }));
        }
    }

    let hits = registry::search_records(conn, name, 10)?;
    Ok(hits.into_iter().find_map(to_subject))
}

fn find_fact<'a>(facts: &'a [VaultEntry], key: &str) -> Option<&'a VaultEntry> {
    facts.iter().find(|f| f.key == key).or_else(|| {
        facts
            .iter()
            .find(|f| f.key.contains(key) || key.contains(f.key.as_str()))
    })
}

fn list_keys(facts: &[VaultEntry], limit: usize) -> String {
    facts
        .iter()
        .take(limit)
        .map(|f| humanize_key(&f.key))
        .collect::<Vec<_>>()
        .join(", ")
}

fn more_suffix(total: usize, shown: usize) -> String {
    if total > shown {
        format!(" +{} more", total - shown)
    } else {
        String::new()
    }
}

fn answer_attribute(
    conn: &Connection,
    intent: QueryIntent,
    subject_name: &str,
    raw_key: &str,
    config: &QueryConfig,
) -> Result<QueryAnswer> {
    let key = uri::normalize(raw_key);
    let Some(subject) = resolve_subject(conn, subject_name, &key)? else {
        return Ok(QueryAnswer::message(
            intent,
            format!("I do not know who {subject_name} is yet."),
        ));
    };

    let facts = vault::get_by_uri(conn, &subject.uri, false)?;
    let mut answer = QueryAnswer::message(intent, String::new());
    answer.subject_uri = Some(subject.uri.to_string());

    if facts.is_empty() {
        answer.message = format!("I do not have any facts about {} yet.", subject.display_name);
        return Ok(answer);
    }

    match find_fact(&facts, &key) {
        Some(fact) => {
            let value = fact.value.clone().unwrap_or_default();
            answer.message = format!(
                "{}'s {} is {}.",
                subject.display_name,
                humanize_key(&fact.key),
                value
            );
            answer.key = Some(fact.key.clone());
            answer.value = Some(value);
        }
        None => {
            answer.message = format!(
                "I do not have {} for {} yet. Known facts: {}.",
                humanize_key(&key),
                subject.display_name,
                list_keys(&facts, config.known_facts_limit)
            );
            answer.key = Some(key);
        }
    }
    Ok(answer)
}

fn answer_profile(
    conn: &Connection,
    intent: QueryIntent,
    subject_name: &str,
    config: &QueryConfig,
) -> Result<QueryAnswer> {
    let Some(subject) = resolve_subject(conn, subject_name, "")? else {
        return Ok(QueryAnswer::message(
            intent,
            format!("I do not know who {subject_name} is yet."),
        ));
    };

    let facts = vault::get_by_uri(conn, &subject.uri, false)?;
    let mut answer = QueryAnswer::message(intent, String::new());
    answer.subject_uri = Some(subject.uri.to_string());

    if facts.is_empty() {
        answer.message = format!("I do not have any facts about {} yet.", subject.display_name);
        return Ok(answer);
    }

    let shown: Vec<String> = facts
        .iter()
        .take(config.known_facts_limit)
        .map(|f| format!("{} is {}", humanize_key(&f.key), f.value.as_deref().unwrap_or("")))
        .collect();
    answer.message = format!(
        "{}: {}.{}",
        subject.display_name,
        shown.join("; "),
        more_suffix(facts.len(), shown.len())
    );
    Ok(answer)
}

fn display_name_for(conn: &Connection, uri_text: &str) -> Result<String> {
    if let Some(uri) = uri::parse(uri_text) {
        if let Some(record) = registry::get_record(conn, &uri)? {
            return Ok(record.display_name);
        }
        return Ok(humanize_key(uri.leaf()));
    }
    Ok(uri_text.to_string())
}

fn answer_global(
    conn: &Connection,
    intent: QueryIntent,
    raw_key: &str,
    config: &QueryConfig,
) -> Result<QueryAnswer> {
    let key = uri::normalize(raw_key);
    let matches = if key.is_empty() {
        Vec::new()
    } else {
        vault::get_by_key(conn, &key)?
    };

    if matches.is_empty() {
        // "What is Joe" reads as a global query but means a profile.
        if resolve_subject(conn, raw_key, "")?.is_some() {
            return answer_profile(conn, intent, raw_key, config);
        }
        let mut answer = QueryAnswer::message(
            intent,
            format!("I do not have anything stored as {} yet.", humanize_key(&key)),
        );
        answer.key = Some(key);
        return Ok(answer);
    }

    let label = humanize_key(&key);
    let mut answer = QueryAnswer::message(intent, String::new());
    answer.key = Some(key);

    if let [only] = matches.as_slice() {
        let name = display_name_for(conn, &only.uri)?;
        let value = only.value.clone().unwrap_or_default();
        answer.message = format!("{name}'s {label} is {value}.");
        answer.subject_uri = Some(only.uri.clone());
        answer.value = Some(value);
        return Ok(answer);
    }

    let mut samples = Vec::new();
    for entry in matches.iter().take(config.global_sample_limit) {
        let name = display_name_for(conn, &entry.uri)?;
        samples.push(format!("{name} ({})", entry.value.as_deref().unwrap_or("")));
    }
    answer.message = format!(
        "{label}: {}{}.",
        samples.join(", "),
        more_suffix(matches.len(), samples.len())
    );
    Ok(answer)
}

/// Answer one question from stored facts.
pub fn answer_question(conn: &Connection, text: &str, config: &QueryConfig) -> Result<QueryAnswer> {
    let intent = classify(text);
    tracing::debug!(intent = ?intent, "question classified");

    match intent.clone() {
        QueryIntent::Possessive { subject, key } | QueryIntent::ForForm { subject, key } => {
            answer_attribute(conn, intent, &subject, &key, config)
        }
        QueryIntent::Profile { subject } => answer_profile(conn, intent, &subject, config),
        QueryIntent::Global { key } => answer_global(conn, intent, &key, config),
        QueryIntent::Unrecognized => Ok(QueryAnswer::message(intent, FORMAT_HINT.to_string())),
    }
}
