//! Canonical text -> token pipeline shared by ingestion, keyword extraction, and querying.
//!
//! The pipeline never fails: empty input yields empty output, and every character class
//! the source data throws at it (code fences, emoji, UUIDs) is either folded, split, or
//! dropped rather than rejected.

use std::collections::HashSet;
use std::sync::OnceLock;

/// Tech acronyms that are kept even though they are shorter than `min_token_len`.
const ACRONYM_ALLOWLIST: &[&str] = &[
    "ai", "ml", "ui", "ux", "db", "os", "js", "ts", "py", "go", "ci", "cd", "qa",
];

/// English stop words plus chat/code "ceremony" words that would otherwise dominate
/// the inverted index without carrying topical signal.
const STOP_WORDS: &[&str] = &[
    // generic English stop words
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was",
    "one", "our", "out", "day", "get", "has", "him", "his", "how", "man", "new", "now",
    "old", "see", "two", "way", "who", "boy", "did", "its", "let", "put", "say", "she",
    "too", "use", "that", "this", "with", "have", "from", "they", "been", "were", "said",
    "each", "which", "their", "will", "about", "would", "there", "could", "other", "into",
    "more", "some", "than", "then", "them", "these", "when", "where", "what", "your",
    "just", "also", "like", "only", "over", "such", "being", "doing", "does", "very",
    "while", "should", "because", "after", "before", "between", "here", "both", "same",
    "once", "again", "any", "few", "most", "own", "off", "under", "those", "why",
    // chat-meta words
    "conversation", "message", "messages", "session", "chat", "assistant", "user",
    // generic code ceremony words
    "function", "const", "return", "import", "export", "class", "public", "private",
    "static", "void", "null", "true", "false", "self", "impl", "struct", "enum", "trait",
    "async", "await", "let", "mut", "fn", "pub", "use", "mod", "crate", "match",
    // month abbreviations
    "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

fn acronym_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| ACRONYM_ALLOWLIST.iter().copied().collect())
}

fn stop_word_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

/// Tokenize `text` into the canonical, filtered stream used for indexing and querying.
pub fn tokenize(text: &str) -> Vec<String> {
    tokenize_with_min_len(text, 3)
}

/// Like [`tokenize`], but with a configurable minimum token length (the allowlist is
/// always honoured regardless of this threshold).
pub fn tokenize_with_min_len(text: &str, min_len: usize) -> Vec<String> {
    let folded: String = text
        .chars()
        .flat_map(|c| c.to_lowercase())
        .map(|c| if c.is_ascii_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();

    folded
        .split_whitespace()
        .filter(|tok| tok.len() >= min_len || acronym_set().contains(tok))
        .filter(|tok| !is_code_noise(tok))
        .filter(|tok| !stop_word_set().contains(tok))
        .map(|s| s.to_string())
        .collect()
}

/// True if `tok` matches one of the code-noise patterns that should never enter the
/// vocabulary: pure digits, pure underscore/hyphen runs, long hex ids, upper-snake
/// constants (folded already so this only catches digit+letter mixes), and
/// digit/letter mixes typical of identifiers.
fn is_code_noise(tok: &str) -> bool {
    if tok.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    if tok.len() >= 8 && tok.chars().all(|c| c.is_ascii_hexdigit()) {
        return true;
    }
    let has_digit = tok.chars().any(|c| c.is_ascii_digit());
    let has_alpha = tok.chars().any(|c| c.is_ascii_alphabetic());
    if has_digit && has_alpha {
        return true;
    }
    false
}
