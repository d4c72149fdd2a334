//! Query normalization.
//!
//! Raw queries are sanitized before they reach the index: characters outside
//! the word/hyphen/underscore/space classes are stripped and whitespace is
//! collapsed. A single surviving word longer than two characters expands into
//! an OR of the verbatim term and a prefix form, approximating substring
//! matching; anything else passes through as plain terms.

use regex_lite::Regex;

/// A normalized query term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTerm {
    /// Match the token exactly.
    Exact(String),

    /// Match any token starting with this stem.
    Prefix(String),
}

impl QueryTerm {
    /// The underlying word, regardless of match mode.
    pub fn word(&self) -> &str {
        match self {
            Self::Exact(w) | Self::Prefix(w) => w,
        }
    }
}

/// Normalize a raw query into match terms.
///
/// Returns an empty vec for blank or fully-stripped queries; callers treat
/// that as an empty result set, not an error.
pub fn normalize_query(query: &str) -> Vec<QueryTerm> {
    static STRIP: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let strip = STRIP.get_or_init(|| Regex::new(r"[^\w\- ]").unwrap());

    let cleaned = strip.replace_all(query, " ").to_lowercase();
    let words: Vec<&str> = cleaned.split_whitespace().collect();

    match words.as_slice() {
        [] => Vec::new(),
        [word] if word.len() > 2 => vec![
            QueryTerm::Exact((*word).to_string()),
            QueryTerm::Prefix((*word).to_string()),
        ],
        _ => words
            .iter()
            .map(|w| QueryTerm::Exact((*w).to_string()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_blank_query_yields_no_terms() {
        assert!(normalize_query("").is_empty());
        assert!(normalize_query("   ").is_empty());
        assert!(normalize_query("!!!").is_empty());
    }

    #[test]
    fn test_single_word_expands_to_prefix() {
        assert_eq!(
            normalize_query("fox"),
            vec![
                QueryTerm::Exact("fox".to_string()),
                QueryTerm::Prefix("fox".to_string())
            ]
        );
    }

    #[test]
    fn test_short_single_word_stays_exact() {
        assert_eq!(normalize_query("ox"), vec![QueryTerm::Exact("ox".to_string())]);
    }

    #[test]
    fn test_multi_word_passes_through() {
        assert_eq!(
            normalize_query("quick  brown fox"),
            vec![
                QueryTerm::Exact("quick".to_string()),
                QueryTerm::Exact("brown".to_string()),
                QueryTerm::Exact("fox".to_string())
            ]
        );
    }

    #[test]
    fn test_punctuation_stripped_and_lowercased() {
        assert_eq!(
            normalize_query("What's UP?"),
            vec![
                QueryTerm::Exact("what".to_string()),
                QueryTerm::Exact("s".to_string()),
                QueryTerm::Exact("up".to_string())
            ]
        );
    }

    #[test]
    fn test_hyphen_and_underscore_survive() {
        assert_eq!(
            normalize_query("half-life"),
            vec![
                QueryTerm::Exact("half-life".to_string()),
                QueryTerm::Prefix("half-life".to_string())
            ]
        );
        assert_eq!(
            normalize_query("snake_case"),
            vec![
                QueryTerm::Exact("snake_case".to_string()),
                QueryTerm::Prefix("snake_case".to_string())
            ]
        );
    }
}
