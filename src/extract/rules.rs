//! Ordered rule table for the deterministic extractor.
//!
//! Each [`Rule`] pairs a pattern with a guard. Rules are tried top to bottom
//! and the first one whose pattern matches and whose guard does not say
//! [`Verdict::Skip`] decides the outcome. A [`Verdict::Reject`] ends
//! extraction with nothing: the capture looks like it swallowed another
//! clause, and a wrong fact is worse than no fact.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use super::{is_question, Extraction, ExtractionSource, Triple, RULE_CONFIDENCE};

/// What a guard decides about a matched candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// The pattern does not really apply; try the next rule.
    Skip,
    /// Stop and report no extraction.
    Reject,
}

/// Raw captures before cleanup and addressing.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub subject: String,
    pub key: String,
    pub value: String,
}

struct Rule {
    name: &'static str,
    pattern: Regex,
    build: fn(&Captures) -> Candidate,
    guard: fn(&Candidate) -> Verdict,
}

const RELATIONS: &str = "girlfriend|boyfriend|wife|husband|partner|fiancee|fiance|mom|mother|dad|father|brother|sister|son|daughter|boss|best friend|friend|roommate|doctor|dentist|therapist|landlord|neighbor|neighbour";

/// Leading words that mean a loose pattern grabbed the wrong subject.
const NOT_A_SUBJECT: &[&str] = &[
    "the", "a", "an", "this", "that", "it", "my", "your", "his", "her", "our", "their", "there",
    "here", "i", "what", "who", "where", "when", "why", "how", "which", "remember", "set",
];

fn rule(
    name: &'static str,
    pattern: &str,
    build: fn(&Captures) -> Candidate,
    guard: fn(&Candidate) -> Verdict,
) -> Rule {
    Rule {
        name,
        pattern: Regex::new(&format!("(?i)^{pattern}$")).expect("rule pattern must compile"),
        build,
        guard,
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        rule(
            "self_introduction",
            r"my name is (.+)",
            |c| Candidate {
                subject: "me".into(),
                key: "name".into(),
                value: cap(c, 1),
            },
            // Needs the owner's identity, which only the model path has context for.
            |_| Verdict::Reject,
        ),
        rule(
            "relationship_self",
            &format!(r"my ({RELATIONS})'s name is (.+)"),
            |c| Candidate {
                subject: cap(c, 2),
                key: "relationship".into(),
                value: capitalize(&cap(c, 1)),
            },
            |c| reject_if_swallowed(&c.subject),
        ),
        rule(
            "relationship_inverse",
            &format!(r"(.+?) is my ({RELATIONS})"),
            |c| Candidate {
                subject: cap(c, 1),
                key: "relationship".into(),
                value: capitalize(&cap(c, 2)),
            },
            |c| {
                if leads_with_non_subject(&c.subject) {
                    return Verdict::Skip;
                }
                reject_if_swallowed(&c.subject)
            },
        ),
        rule(
            "possessive",
            r"(.+?)'s (.+?) is (.+)",
            |c| Candidate {
                subject: cap(c, 1),
                key: cap(c, 2),
                value: cap(c, 3),
            },
            |c| {
                let lower = c.subject.to_lowercase();
                // Imperative forms have their own rules further down.
                if lower.starts_with("remember ") || lower.starts_with("set ") {
                    return Verdict::Skip;
                }
                reject_if_swallowed(&c.subject)
            },
        ),
        rule(
            "residence",
            r"(.+?) lives (?:at|in|on) (.+)",
            |c| Candidate {
                subject: cap(c, 1),
                key: "address".into(),
                value: cap(c, 2),
            },
            |c| {
                if leads_with_non_subject(&c.subject) {
                    return Verdict::Skip;
                }
                if swallowed_clause(&c.subject) || swallowed_clause(&c.value) {
                    return Verdict::Reject;
                }
                // A copula in the place means a trailing clause, not an address.
                if padded(&c.value).contains(" is ") {
                    return Verdict::Reject;
                }
                Verdict::Accept
            },
        ),
        rule(
            "address_for",
            r"(?:the )?address (?:for|of) (.+?) is (.+)",
            |c| Candidate {
                subject: cap(c, 1),
                key: "address".into(),
                value: cap(c, 2),
            },
            |c| {
                if padded(&c.value).contains(" is ") {
                    return Verdict::Reject;
                }
                reject_if_swallowed(&c.subject)
            },
        ),
        rule(
            "subject_attribute",
            r"([a-z][\w-]*) (.+?) is (.+)",
            |c| Candidate {
                subject: cap(c, 1),
                key: cap(c, 2),
                value: cap(c, 3),
            },
            |c| {
                if leads_with_non_subject(&c.subject) {
                    return Verdict::Skip;
                }
                let key = padded(&c.key);
                // "Y for X is Z" and possessives belong to other rules.
                if key.contains(" for ") || key.contains("'s ") {
                    return Verdict::Skip;
                }
                Verdict::Accept
            },
        ),
        rule(
            "attribute_for",
            r"(?:the )?(.+?) for (.+?) is (.+)",
            |c| Candidate {
                subject: cap(c, 2),
                key: cap(c, 1),
                value: cap(c, 3),
            },
            |c| reject_if_swallowed(&c.subject),
        ),
        rule(
            "set_imperative",
            r"set (.+?)'s (.+?) to (.+)",
            |c| Candidate {
                subject: cap(c, 1),
                key: cap(c, 2),
                value: cap(c, 3),
            },
            |c| reject_if_swallowed(&c.subject),
        ),
        rule(
            "remember_imperative",
            r"remember (?:that )?(.+?)'s (.+?) is (.+)",
            |c| Candidate {
                subject: cap(c, 1),
                key: cap(c, 2),
                value: cap(c, 3),
            },
            |c| reject_if_swallowed(&c.subject),
        ),
        rule(
            "delimited",
            r"(.+?):\s*(.+?)\s*=\s*(.+)",
            |c| Candidate {
                subject: cap(c, 1),
                key: cap(c, 2),
                value: cap(c, 3),
            },
            |_| Verdict::Accept,
        ),
    ]
});

/// Run the rule table over `text`.
///
/// Returns a complete triple at [`RULE_CONFIDENCE`] on a match, otherwise a
/// zero-confidence empty result. The question flag is set either way.
pub fn extract(text: &str) -> Extraction {
    let question = is_question(text);
    let prepared = prepare(text);
    if prepared.is_empty() {
        return Extraction::empty(question);
    }

    for rule in RULES.iter() {
        let Some(captures) = rule.pattern.captures(&prepared) else {
            continue;
        };
        let candidate = (rule.build)(&captures);
        match (rule.guard)(&candidate) {
            Verdict::Skip => continue,
            Verdict::Reject => {
                tracing::debug!(rule = rule.name, "extraction deferred by guard");
                return Extraction::empty(question);
            }
            Verdict::Accept => {}
        }
        let Some(triple) = Triple::new(&candidate.subject, &candidate.key, &candidate.value)
        else {
            continue;
        };
        tracing::debug!(rule = rule.name, uri = %triple.uri, key = %triple.key, "rule matched");
        return Extraction {
            triple: Some(triple),
            is_question: question,
            confidence: RULE_CONFIDENCE,
            source: ExtractionSource::Rules,
            rule: Some(rule.name),
        };
    }

    Extraction::empty(question)
}

/// Trim, unify apostrophes, drop trailing sentence punctuation.
fn prepare(text: &str) -> String {
    text.trim()
        .replace(['\u{2019}', '\u{2018}'], "'")
        .trim_end_matches(['.', '!', '?'])
        .trim()
        .to_string()
}

fn cap(c: &Captures, i: usize) -> String {
    c.get(i).map(|m| m.as_str().trim().to_string()).unwrap_or_default()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn padded(s: &str) -> String {
    format!(" {} ", s.to_lowercase())
}

fn swallowed_clause(s: &str) -> bool {
    padded(s).contains(" and i ")
}

fn reject_if_swallowed(subject: &str) -> Verdict {
    if swallowed_clause(subject) {
        Verdict::Reject
    } else {
        Verdict::Accept
    }
}

fn leads_with_non_subject(subject: &str) -> bool {
    subject
        .split_whitespace()
        .next()
        .is_some_and(|w| NOT_A_SUBJECT.contains(&w.to_lowercase().as_str()))
}
