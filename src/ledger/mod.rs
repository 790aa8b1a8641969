//! Ledger / registry / vault store.
//!
//! Every summoning writes one [`types::LedgerEntry`]. Facts extracted from it
//! land in the registry and vault with that entry's id as their audit receipt,
//! so every stored value can answer "why do I know this".

pub mod entries;
pub mod registry;
pub mod search;
pub mod types;
pub mod vault;

/// Current UTC time as a fixed-width RFC 3339 string, so text ordering
/// matches time ordering.
pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// `%needle%` with LIKE wildcards escaped (use with `ESCAPE '\'`).
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
