//! Keyword Extractor (spec §4.3): corpus-wide TF-IDF, top-K terms per document.

use std::collections::HashMap;

use crate::document::ConversationDocument;
use crate::tokenizer;

/// Compute top-K TF-IDF keywords for every document in `documents`, keyed by document id.
///
/// Stop words and code-noise tokens never appear — the tokenizer has already removed
/// them from `unique_terms`/`full_text`. Terms are kept verbatim; no stemming.
pub fn extract_keywords(
    documents: &HashMap<String, ConversationDocument>,
    top_k: usize,
) -> HashMap<String, Vec<(String, f64)>> {
    let n = documents.len();
    if n == 0 {
        return HashMap::new();
    }

    // Per-document term frequency, built once so we don't re-tokenize full_text twice.
    let mut term_freqs: HashMap<&str, HashMap<String, u64>> = HashMap::new();
    let mut doc_freq: HashMap<String, u64> = HashMap::new();

    for (id, doc) in documents {
        let mut tf: HashMap<String, u64> = HashMap::new();
        for term in tokenizer::tokenize(&doc.full_text) {
            *tf.entry(term).or_insert(0) += 1;
        }
        for term in tf.keys() {
            *doc_freq.entry(term.clone()).or_insert(0) += 1;
        }
        term_freqs.insert(id.as_str(), tf);
    }

    let mut result = HashMap::with_capacity(n);
    for (id, tf) in &term_freqs {
        let mut scored: Vec<(String, f64, u64)> = tf
            .iter()
            .map(|(term, &freq)| {
                let df = doc_freq.get(term).copied().unwrap_or(1).max(1);
                let idf = ((n as f64) / (df as f64)).ln();
                let score = round2(freq as f64 * idf);
                (term.clone(), score, freq)
            })
            .collect();

        // Ties: higher score first, then higher raw frequency, then lexicographic term.
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.2.cmp(&a.2))
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(top_k);

        result.insert(
            id.to_string(),
            scored.into_iter().map(|(term, score, _)| (term, score)).collect(),
        );
    }

    result
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ConversationDocument;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn doc(id: &str, text: &str) -> ConversationDocument {
        ConversationDocument {
            id: id.to_string(),
            project: "demo".to_string(),
            original_path: PathBuf::from(format!("/tmp/{id}.jsonl")),
            modified: Utc::now(),
            message_count: 1,
            word_count: text.split_whitespace().count(),
            content_hash: "hash".to_string(),
            full_text: text.to_string(),
            preview: text.to_string(),
            tools_used: HashSet::new(),
            top_keywords: Vec::new(),
            unique_terms: HashSet::new(),
        }
    }

    #[test]
    fn empty_corpus_yields_empty_map() {
        let docs = HashMap::new();
        assert!(extract_keywords(&docs, 10).is_empty());
    }

    #[test]
    fn distinctive_terms_rank_above_common_ones() {
        let mut docs = HashMap::new();
        docs.insert(
            "a".to_string(),
            doc("a", "rust rust rust programming programming shared"),
        );
        docs.insert("b".to_string(), doc("b", "python python programming shared"));
        docs.insert("c".to_string(), doc("c", "javascript shared shared shared"));

        let keywords = extract_keywords(&docs, 5);
        let a_terms: Vec<&str> = keywords["a"].iter().map(|(t, _)| t.as_str()).collect();
        // "rust" appears only in doc a -> higher idf than "shared" (appears in all 3).
        assert_eq!(a_terms[0], "rust");
        assert!(!a_terms.contains(&"shared") || a_terms.iter().position(|&t| t == "shared") > Some(0));
    }

    #[test]
    fn respects_top_k_bound() {
        let mut docs = HashMap::new();
        docs.insert(
            "a".to_string(),
            doc("a", "alpha beta gamma delta epsilon zeta eta theta"),
        );
        let keywords = extract_keywords(&docs, 3);
        assert_eq!(keywords["a"].len(), 3);
    }

    #[test]
    fn scores_rounded_to_two_decimals() {
        let mut docs = HashMap::new();
        docs.insert("a".to_string(), doc("a", "lonely"));
        docs.insert("b".to_string(), doc("b", "other words here"));
        let keywords = extract_keywords(&docs, 10);
        for (_, score) in &keywords["a"] {
            let rounded = (score * 100.0).round() / 100.0;
            assert!((rounded - score).abs() < 1e-9);
        }
    }
}
