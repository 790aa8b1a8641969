//! Permissive "key: value" / "key is value" scanner.
//!
//! Feeds pattern mining only. It reports every plausible pair in a text and
//! makes no attempt at subjects, so its output never reaches the vault.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::uri;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pair {
    pub key: String,
    pub value: String,
}

static PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*([a-z][a-z0-9' -]{0,40}?)\s*(?::|\s+is\s+)\s*(.+?)\s*$")
        .expect("pair pattern must compile")
});

const PRONOUNS: &[&str] = &[
    "i", "me", "you", "he", "she", "it", "we", "they", "this", "that", "there", "here", "what",
    "who", "which", "these", "those",
];

/// Scan every clause of `text` for `key: value` or `key is value`.
pub fn extract_all_pairs(text: &str) -> Vec<Pair> {
    text.split(['.', ';', ',', '\n', '!', '?'])
        .filter_map(|clause| {
            let c = PAIR.captures(clause)?;
            let raw_key = c.get(1)?.as_str().trim().to_lowercase();
            if PRONOUNS.contains(&raw_key.as_str()) {
                return None;
            }
            let key = uri::normalize(&raw_key);
            let value = super::clean_capture(c.get(2)?.as_str());
            if key.is_empty() || value.is_empty() {
                return None;
            }
            Some(Pair { key, value })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_colon_and_is_pairs() {
        let pairs = extract_all_pairs("wifi: hunter2; the door code is 4411. Parking is level 3");
        let keys: Vec<&str> = pairs.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["wifi", "the_door_code", "parking"]);
        assert_eq!(pairs[0].value, "hunter2");
        assert_eq!(pairs[1].value, "4411");
        assert_eq!(pairs[2].value, "level 3");
    }

    #[test]
    fn skips_pronoun_keys() {
        assert!(extract_all_pairs("It is late. That is fine").is_empty());
    }

    #[test]
    fn empty_text_has_no_pairs() {
        assert!(extract_all_pairs("").is_empty());
        assert!(extract_all_pairs("just words here").is_empty());
    }
}
