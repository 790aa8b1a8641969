//! Canonical namespaced identifiers for ledger subjects.
//!
//! Every subject the ledger knows about is addressed as
//! `dojo.<namespace>.<slug>[.<subslug>...]`, e.g. `dojo.con.joe`. This module
//! owns slug normalization, strict construction ([`Uri::new`]), lenient
//! parsing of untrusted text ([`parse`]) and the keyword heuristic that picks
//! a namespace for a bare display name ([`infer_namespace`]).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// First segment of every identifier.
pub const ROOT_TOKEN: &str = "dojo";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// The four subject namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// People. The default when no keyword matches.
    Contact,
    /// Places, stores, doors, devices.
    Entity,
    /// Health observations about the owner.
    Medical,
    /// Reminders, schedules and other housekeeping.
    System,
}

impl Namespace {
    /// Short code used in the rendered identifier.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Contact => "con",
            Self::Entity => "ent",
            Self::Medical => "med",
            Self::System => "sys",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Entity => "entity",
            Self::Medical => "medical",
            Self::System => "system",
        }
    }

    /// Accepts either the short code or the long name.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "con" | "contact" => Some(Self::Contact),
            "ent" | "entity" => Some(Self::Entity),
            "med" | "medical" => Some(Self::Medical),
            "sys" | "system" => Some(Self::System),
            _ => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated identifier. Equality is structural: namespace plus slug path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uri {
    namespace: Namespace,
    segments: Vec<String>,
}

impl Uri {
    /// Build an identifier from already-normalized slug segments.
    ///
    /// Fails with [`UriError::InvalidIdentifier`] if `segments` is empty or any
    /// segment is not a valid slug.
    pub fn new(namespace: Namespace, segments: Vec<String>) -> Result<Self, UriError> {
        if segments.is_empty() {
            return Err(UriError::InvalidIdentifier(format!(
                "{ROOT_TOKEN}.{}: missing slug",
                namespace.code()
            )));
        }
        if let Some(bad) = segments.iter().find(|s| !is_valid_slug(s)) {
            return Err(UriError::InvalidIdentifier(format!(
                "{ROOT_TOKEN}.{}: bad slug segment {bad:?}",
                namespace.code()
            )));
        }
        Ok(Self {
            namespace,
            segments,
        })
    }

    /// Normalize a display name into a single-segment identifier.
    pub fn from_display_name(name: &str, namespace: Namespace) -> Result<Self, UriError> {
        let slug = normalize(name);
        if slug.is_empty() {
            return Err(UriError::InvalidIdentifier(format!(
                "display name {name:?} has no usable characters"
            )));
        }
        Self::new(namespace, vec![slug])
    }

    /// Use `subject` as-is if it is already a full identifier, otherwise
    /// build one from it with a namespace inferred from `subject` and `context`.
    pub fn resolve(subject: &str, context: &str) -> Result<Self, UriError> {
        if let Some(uri) = parse(subject) {
            return Ok(uri);
        }
        let namespace = infer_namespace(&format!("{subject} {context}"));
        Self::from_display_name(subject, namespace)
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last slug segment.
    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Append a sub-slug, e.g. `dojo.ent.railroad` → `dojo.ent.railroad.north_gate`.
    pub fn child(&self, name: &str) -> Result<Self, UriError> {
        let slug = normalize(name);
        let mut segments = self.segments.clone();
        segments.push(slug);
        Self::new(self.namespace, segments)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ROOT_TOKEN}.{}", self.namespace.code())?;
        for segment in &self.segments {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Uri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() < 3 {
            return Err(UriError::InvalidIdentifier(format!(
                "{s:?}: expected root.namespace.slug"
            )));
        }
        if parts[0] != ROOT_TOKEN {
            return Err(UriError::InvalidIdentifier(format!(
                "{s:?}: root must be {ROOT_TOKEN:?}"
            )));
        }
        let namespace = Namespace::from_segment(parts[1]).ok_or_else(|| {
            UriError::InvalidIdentifier(format!("{s:?}: unknown namespace {:?}", parts[1]))
        })?;
        Self::new(namespace, parts[2..].iter().map(|p| p.to_string()).collect())
    }
}

impl Serialize for Uri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Uri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse untrusted text as an identifier. Returns `None` rather than an error,
/// since free text is usually not an identifier at all.
pub fn parse(text: &str) -> Option<Uri> {
    text.parse().ok()
}

/// Canonical slug for a display name.
///
/// Lowercases, drops apostrophes, collapses every run of other non-alphanumeric
/// characters into one `_`, and trims so the result starts with a letter and
/// never ends with `_`. Idempotent. Empty when the input has no ASCII letters.
pub fn normalize(display_name: &str) -> String {
    let mut slug = String::with_capacity(display_name.len());
    let mut pending_separator = false;

    for ch in display_name.chars().flat_map(char::to_lowercase) {
        if matches!(ch, '\'' | '\u{2019}' | '\u{2018}') {
            continue;
        }
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(ch);
        } else {
            pending_separator = true;
        }
    }

    slug.trim_start_matches(|c: char| c.is_ascii_digit() || c == '_')
        .to_string()
}

fn is_valid_slug(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

const ENTITY_KEYWORDS: &[&str] = &[
    "place", "store", "shop", "gate", "door", "restaurant", "cafe", "bar", "office",
    "building", "apartment", "house", "garage", "locker", "park", "gym", "school",
    "station", "airport", "hotel", "bank", "company", "wifi", "router", "car",
];

const MEDICAL_KEYWORDS: &[&str] = &[
    "symptom", "blood", "mood", "pain", "headache", "migraine", "fever", "allergy",
    "medication", "medicine", "dose", "dosage", "prescription", "diagnosis", "sleep",
    "weight", "pulse", "glucose", "cholesterol",
];

const SYSTEM_KEYWORDS: &[&str] = &[
    "sync", "schedule", "reminder", "alarm", "timer", "backup", "setting", "config",
    "notification", "routine",
];

/// Keyword heuristic for the namespace of a subject. Not a classifier:
/// the first list with a hit wins, in the order entity, medical, system;
/// anything else is a contact.
pub fn infer_namespace(free_text: &str) -> Namespace {
    let normalized = normalize(free_text);
    let words: Vec<&str> = normalized.split('_').filter(|w| !w.is_empty()).collect();
    let hit = |keywords: &[&str]| {
        words.iter().any(|w| {
            keywords.contains(w) || w.strip_suffix('s').is_some_and(|s| keywords.contains(&s))
        })
    };

    if hit(ENTITY_KEYWORDS) {
        Namespace::Entity
    } else if hit(MEDICAL_KEYWORDS) {
        Namespace::Medical
    } else if hit(SYSTEM_KEYWORDS) {
        Namespace::System
    } else {
        Namespace::Contact
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_basic_names() {
        assert_eq!(normalize("Joe"), "joe");
        assert_eq!(normalize("Joe's"), "joes");
        assert_eq!(normalize("Mary  Ann--Smith"), "mary_ann_smith");
        assert_eq!(normalize("  Gate Code! "), "gate_code");
        assert_eq!(normalize("O\u{2019}Brien"), "obrien");
    }

    #[test]
    fn normalize_strips_leading_digits_and_underscores() {
        assert_eq!(normalize("42nd Street"), "nd_street");
        assert_eq!(normalize("__x__"), "x");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "Joe", "Joe's coffee", "  Dr. Who? ", "1234", "!!!", "", "a_b__c", "ÉCOLE 42",
            "Gate code for Railroad", "x9-y8 z7", "_lead", "trail_",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
            assert!(
                once.is_empty() || is_valid_slug(&once),
                "{once:?} is not a valid slug (from {s:?})"
            );
        }
    }

    #[test]
    fn normalize_is_empty_only_without_letters() {
        assert_eq!(normalize("!!! ???"), "");
        assert_eq!(normalize("1234"), "");
    }

    #[test]
    fn parse_accepts_codes_and_long_names() {
        let a = parse("dojo.con.joe").unwrap();
        let b = parse("dojo.contact.joe").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "dojo.con.joe");

        let nested = parse("dojo.ent.railroad.north_gate").unwrap();
        assert_eq!(nested.namespace(), Namespace::Entity);
        assert_eq!(nested.segments().len(), 2);
        assert_eq!(nested.leaf(), "north_gate");
    }

    #[test]
    fn parse_rejects_malformed_text() {
        assert!(parse("Joe's coffee is Espresso").is_none());
        assert!(parse("dojo.con").is_none());
        assert!(parse("other.con.joe").is_none());
        assert!(parse("dojo.pets.rex").is_none());
        assert!(parse("dojo.con.Joe").is_none());
        assert!(parse("dojo.con.9lives").is_none());
        assert!(parse("dojo.con.").is_none());
    }

    #[test]
    fn new_rejects_invalid_slug() {
        let err = Uri::new(Namespace::Contact, vec!["Bad Slug".into()]).unwrap_err();
        assert!(matches!(err, UriError::InvalidIdentifier(_)));
        assert!(Uri::new(Namespace::Contact, vec![]).is_err());
        assert!(Uri::from_display_name("???", Namespace::Contact).is_err());
    }

    #[test]
    fn infer_namespace_priority() {
        assert_eq!(infer_namespace("Joe"), Namespace::Contact);
        assert_eq!(infer_namespace("Railroad gate code"), Namespace::Entity);
        assert_eq!(infer_namespace("blood pressure"), Namespace::Medical);
        assert_eq!(infer_namespace("weekly backup schedule"), Namespace::System);
        // entity beats medical
        assert_eq!(infer_namespace("pharmacy store blood test"), Namespace::Entity);
        // plural keywords still count
        assert_eq!(infer_namespace("symptoms"), Namespace::Medical);
    }

    #[test]
    fn resolve_prefers_full_identifier() {
        let uri = Uri::resolve("dojo.med.me", "coffee").unwrap();
        assert_eq!(uri.namespace(), Namespace::Medical);

        let inferred = Uri::resolve("Railroad", "gate_code").unwrap();
        assert_eq!(inferred.to_string(), "dojo.ent.railroad");
    }

    #[test]
    fn uri_serde_uses_string_form() {
        let uri = parse("dojo.sys.backup").unwrap();
        let json = serde_json::to_string(&uri).unwrap();
        assert_eq!(json, "\"dojo.sys.backup\"");
        let back: Uri = serde_json::from_str(&json).unwrap();
        assert_eq!(back, uri);
    }
}
