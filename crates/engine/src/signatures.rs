//! Failure signature matching over captured task output
//!
//! The configured regex fragments are OR-ed into a single case-insensitive
//! pattern compiled once per run. Scanning always covers the whole accumulated
//! buffer; signatures that straddle a chunk boundary are still caught.

use regex::Regex;
use themegate_core::{Error, Result};

/// Compiled set of failure signatures
#[derive(Debug)]
pub struct SignatureSet {
    regex: Regex,
}

impl SignatureSet {
    /// Compile a signature set from regex fragments
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty set or an invalid fragment.
    pub fn from_patterns(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Err(Error::Config(
                "Signature pattern list cannot be empty".to_string(),
            ));
        }

        let alternation = patterns
            .iter()
            .map(|p| format!("(?:{p})"))
            .collect::<Vec<_>>()
            .join("|");

        let regex = Regex::new(&format!("(?i){alternation}"))
            .map_err(|e| Error::Config(format!("Invalid signature pattern: {e}")))?;

        Ok(Self { regex })
    }

    /// Whether any signature appears in the text
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// The lines containing a signature, trimmed, for operator diagnosis
    #[must_use]
    pub fn matching_lines(&self, text: &str) -> Vec<String> {
        text.lines()
            .filter(|line| self.regex.is_match(line))
            .map(|line| line.trim().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn stock_set() -> SignatureSet {
        SignatureSet::from_patterns(&[
            "error".to_string(),
            "To run this command, log in to Shopify".to_string(),
            "EADDRINUSE".to_string(),
            "address already in use".to_string(),
        ])
        .unwrap()
    }

    #[test]
    fn test_case_insensitive_error_match() {
        let set = stock_set();
        assert!(set.is_match("Error: something exploded"));
        assert!(set.is_match("SHOPIFY CLI ERROR: session expired"));
        assert!(!set.is_match("warning: deprecated call"));
        // "ERR!" is not one of the signatures; only the full word matches
        assert!(!set.is_match("npm ERR! code ELIFECYCLE"));
    }

    #[test]
    fn test_port_conflict_renderings() {
        let set = stock_set();
        assert!(set.is_match("listen EADDRINUSE: address already in use :::9292"));
        assert!(set.is_match("bind: Address already in use"));
    }

    #[test]
    fn test_auth_phrase() {
        let set = stock_set();
        assert!(set.is_match("To run this command, log in to Shopify partners"));
    }

    #[test]
    fn test_signature_straddling_chunks_found_in_buffer() {
        let set = stock_set();
        // Simulates "EADDR" arriving in one chunk and "INUSE" in the next;
        // the accumulated buffer still matches.
        let mut buffer = String::from("listen EADDR");
        assert!(!set.is_match(&buffer));
        buffer.push_str("INUSE :::9292");
        assert!(set.is_match(&buffer));
    }

    #[test]
    fn test_matching_lines_filters_and_trims() {
        let set = stock_set();
        let output = "starting server\n  Error: boom  \nsome progress\nEADDRINUSE :9292\n";

        let lines = set.matching_lines(output);
        assert_eq!(lines, vec!["Error: boom", "EADDRINUSE :9292"]);
    }

    #[test]
    fn test_empty_pattern_list_rejected() {
        assert!(SignatureSet::from_patterns(&[]).is_err());
    }

    #[test]
    fn test_invalid_fragment_rejected() {
        let err = SignatureSet::from_patterns(&["(unclosed".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Invalid signature pattern"));
    }
}
