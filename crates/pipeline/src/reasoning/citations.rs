//! Citation marker extraction.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn citation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\[Source\s+([\w\-.]+)\]").expect("citation pattern is valid")
    })
}

/// Collect the source ids cited as `[Source <id>]` in `text`.
pub fn extract_citations(text: &str) -> BTreeSet<String> {
    citation_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
