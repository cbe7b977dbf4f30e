//! Post-call integrity check.
//!
//! The linking service may only wrap citations in anchors. After removing the
//! anchors it added (keeping their inner text), the returned text must equal
//! the submitted text exactly.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

/// `<a ... href="...">inner</a>` with a plain-text body.
static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?\bhref\s*=\s*["']([^"']*)["'][^>]*>([^<]*)</a\s*>"#).unwrap()
});

/// Integrity check failure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IntegrityError {
    /// The texts differ at the given byte offset (after anchor removal).
    #[error("text changed outside of service links at byte {offset}")]
    Mismatch { offset: usize },
}

/// Compares submitted and returned text modulo service-added anchors.
#[derive(Debug, Clone)]
pub struct IntegrityVerifier {
    hosts: Vec<String>,
}

impl Default for IntegrityVerifier {
    fn default() -> Self {
        Self::new(["dejure.org"])
    }
}

impl IntegrityVerifier {
    /// Verifier that strips anchors pointing at `hosts` or their subdomains.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { hosts: hosts.into_iter().map(|h| h.as_ref().trim().to_ascii_lowercase()).collect() }
    }

    fn is_service_link(&self, href: &str) -> bool {
        let Ok(url) = Url::parse(href.trim()) else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        self.hosts
            .iter()
            .any(|h| host == h || host.strip_suffix(h.as_str()).is_some_and(|rest| rest.ends_with('.')))
    }

    /// Replace every service anchor in `text` by its inner text.
    pub fn strip<'a>(&self, text: &'a str) -> Cow<'a, str> {
        ANCHOR_RE.replace_all(text, |caps: &Captures<'_>| {
            if self.is_service_link(&caps[1]) { caps[2].to_string() } else { caps[0].to_string() }
        })
    }

    /// Check that `candidate` differs from `original` only by service anchors.
    ///
    /// Surrounding whitespace is ignored on both sides.
    pub fn check(&self, original: &str, candidate: &str) -> Result<(), IntegrityError> {
        let original = self.strip(original.trim());
        let candidate = self.strip(candidate.trim());

        if original == candidate {
            return Ok(());
        }

        let offset = original
            .bytes()
            .zip(candidate.bytes())
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| original.len().min(candidate.len()));
        Err(IntegrityError::Mismatch { offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &str = "Nach § 123 BGB und Art. 3 GG gilt das.";

    #[test]
    fn test_accepts_added_links() {
        let candidate = "Nach <a href=\"https://dejure.org/gesetze/BGB/123.html\" title=\"§ 123 BGB\">§ 123 BGB</a> \
                         und <a href=\"http://dejure.org/gesetze/GG/3.html\" target=\"_blank\">Art. 3 GG</a> gilt das.";
        assert_eq!(IntegrityVerifier::default().check(ORIGINAL, candidate), Ok(()));
    }

    #[test]
    fn test_accepts_subdomain_links() {
        let candidate = "Nach <a href=\"https://rechtsnetz.dejure.org/x\">§ 123 BGB</a> und Art. 3 GG gilt das.";
        assert!(IntegrityVerifier::default().check(ORIGINAL, candidate).is_ok());
    }

    #[test]
    fn test_ignores_surrounding_whitespace() {
        assert!(IntegrityVerifier::default().check(&format!("\n  {ORIGINAL}\n"), ORIGINAL).is_ok());
    }

    #[test]
    fn test_rejects_changed_text() {
        let candidate = "Nach <a href=\"https://dejure.org/x\">§ 123 BGB</a> und Art. 4 GG gilt das.";
        let err = IntegrityVerifier::default().check(ORIGINAL, candidate).unwrap_err();
        assert_eq!(err, IntegrityError::Mismatch { offset: ORIGINAL.find("3 GG").unwrap() });
    }

    #[test]
    fn test_rejects_truncated_text() {
        let candidate = "Nach <a href=\"https://dejure.org/x\">§ 123 BGB</a> und";
        assert!(IntegrityVerifier::default().check(ORIGINAL, candidate).is_err());
    }

    #[test]
    fn test_rejects_foreign_links() {
        let candidate = "Nach <a href=\"https://evil.example/dejure.org\">§ 123 BGB</a> und Art. 3 GG gilt das.";
        assert!(IntegrityVerifier::default().check(ORIGINAL, candidate).is_err());

        let candidate = "Nach <a href=\"https://notdejure.org/x\">§ 123 BGB</a> und Art. 3 GG gilt das.";
        assert!(IntegrityVerifier::default().check(ORIGINAL, candidate).is_err());
    }

    #[test]
    fn test_existing_service_links_stripped_on_both_sides() {
        let original = "Vgl. <a href=\"https://dejure.org/a\">§ 1 BGB</a> und § 2 BGB.";
        let candidate = "Vgl. <a href=\"https://dejure.org/a\">§ 1 BGB</a> und <a href=\"https://dejure.org/b\">§ 2 BGB</a>.";
        assert!(IntegrityVerifier::default().check(original, candidate).is_ok());
    }

    #[test]
    fn test_extra_hosts() {
        let verifier = IntegrityVerifier::new(["dejure.org", "buzer.de"]);
        let candidate = "Nach <a href=\"https://www.buzer.de/123_BGB.htm\">§ 123 BGB</a> und Art. 3 GG gilt das.";
        assert!(verifier.check(ORIGINAL, candidate).is_ok());
        assert!(IntegrityVerifier::default().check(ORIGINAL, candidate).is_err());
    }

    #[test]
    fn test_strip_keeps_other_anchors() {
        let text = "<a href=\"https://example.org\">x</a> <a href='https://dejure.org/y'>§ 1</a>";
        assert_eq!(IntegrityVerifier::default().strip(text), "<a href=\"https://example.org\">x</a> § 1");
    }
}
