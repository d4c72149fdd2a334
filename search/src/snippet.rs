//! Snippet extraction for search hits.

/// Default snippet window width, in characters.
pub const DEFAULT_SNIPPET_WIDTH: usize = 150;

/// Extract a snippet around the earliest literal occurrence of any query
/// word of length > 1 in the content.
///
/// The window is centered on the match and bounded by `width` characters,
/// with `...` markers at truncated edges. When no word matches literally
/// (e.g. only a prefix form matched the index), the fallback is a truncated
/// content prefix.
pub fn extract_snippet(content: &str, words: &[&str], width: usize) -> String {
    let lower = content.to_lowercase();

    let match_pos = words
        .iter()
        .filter(|w| w.len() > 1)
        .filter_map(|w| lower.find(&w.to_lowercase()))
        .min();

    match match_pos {
        Some(byte_pos) => {
            let match_char = lower[..byte_pos].chars().count();
            window_at(content, match_char, width)
        }
        None => prefix_snippet(content, width),
    }
}

fn window_at(content: &str, center: usize, width: usize) -> String {
    let chars: Vec<char> = content.chars().collect();
    let start = center.saturating_sub(width / 2);
    let end = (start + width).min(chars.len());

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.extend(&chars[start.min(chars.len())..end]);
    if end < chars.len() {
        out.push_str("...");
    }
    out
}

fn prefix_snippet(content: &str, width: usize) -> String {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= width {
        return content.to_string();
    }
    let mut out: String = chars[..width].iter().collect();
    out.push_str("...");
    out
}
