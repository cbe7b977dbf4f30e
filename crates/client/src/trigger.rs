//! Cheap local pre-checks that decide whether a text needs the linking service.

use std::sync::LazyLock;

use regex::Regex;

/// Substrings that look like German legal citations:
/// section sign, `Art.`, file numbers like `/05`, `1/05` or `12.05`, and `NJW 2005, `-style pages.
static TRIGGER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"§|&sect;|Art\.|/[0-9]{2}(?:[^0-9/]|$)| [0-9]{1,2}[/.][0-9]{2}(?:[^0-9.]|$)|[0-9]{2}, ").unwrap()
});

/// Whether `text` contains anything the linking service could turn into a link.
pub fn has_citation_trigger(text: &str) -> bool {
    TRIGGER_RE.is_match(text)
}

/// Whether `text` carries the opt-out marker.
pub fn has_opt_out(text: &str, marker: &str) -> bool {
    !marker.is_empty() && text.contains(marker)
}
