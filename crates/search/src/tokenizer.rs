//! Text normalization shared by corpus fitting and query scoring.
//!
//! Both sides must go through [`tokenize`]; a term normalized differently at
//! fit time and at query time never matches.

use std::collections::HashSet;

/// Lowercase `text`, treat every character that is not alphanumeric or `_`
/// as a separator, and return the remaining non-empty terms in order.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !is_term_char(c))
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// [`tokenize`] with duplicates removed, keeping first-seen order.
#[must_use]
pub fn unique_terms(text: &str) -> Vec<String> {
    dedup_terms(tokenize(text))
}

pub(crate) fn dedup_terms(terms: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    terms
        .into_iter()
        .filter(|term| seen.insert(term.clone()))
        .collect()
}

fn is_term_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Quarterly TAX report"), vec!["quarterly", "tax", "report"]);
        assert_eq!(tokenize("resume.pdf"), vec!["resume", "pdf"]);
        assert_eq!(tokenize("  hello,   world!! "), vec!["hello", "world"]);
    }

    #[test]
    fn keeps_underscores_and_digits() {
        assert_eq!(tokenize("w2_form 1040-EZ"), vec!["w2_form", "1040", "ez"]);
    }

    #[test]
    fn empty_and_punctuation_only_inputs() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  \t\n").is_empty());
        assert!(tokenize("!?.,;").is_empty());
    }

    #[test]
    fn lowercases_unicode() {
        assert_eq!(tokenize("Überblick Café"), vec!["überblick", "café"]);
    }

    #[test]
    fn unique_terms_keeps_first_seen_order() {
        assert_eq!(unique_terms("tax Tax report tax"), vec!["tax", "report"]);
    }
}
