//! Input normalisation ahead of keyword matching

use regex::Regex;
use std::sync::OnceLock;

fn punctuation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid punctuation pattern"))
}

/// Lowercase, strip punctuation, collapse whitespace and trim.
///
/// Lossy on purpose: downstream matching is keyword based.
pub fn preprocess(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped = punctuation().replace_all(&lowered, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
