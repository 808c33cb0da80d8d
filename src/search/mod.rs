//! The queryable Search Structure (spec §3.3, §4.4): an inverted index over tokens
//! with exact/prefix/fuzzy lookup, plus the stored document fields needed to rank,
//! preview, and locate occurrences without re-reading session files.

mod persist;

pub use persist::{load_index, save_index, write_default_config, PersistedIndex, INDEX_VERSION};

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::document::ConversationDocument;
use crate::tokenizer;

/// The inverted index plus stored document fields. This is what gets serialized as
/// the persisted index file (spec §6.2) and what the Query Engine searches against.
#[derive(Debug, Default, Clone)]
pub struct SearchStructure {
    /// token -> set of document ids containing it (spec §3.3 invariant: completeness).
    postings: HashMap<String, HashSet<String>>,
    /// Sorted token vocabulary, kept alongside `postings` to make prefix lookup a
    /// contiguous-range scan instead of a full hash-map walk.
    vocabulary: BTreeMap<String, ()>,
    documents: HashMap<String, ConversationDocument>,
}

impl SearchStructure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn get_document(&self, id: &str) -> Option<&ConversationDocument> {
        self.documents.get(id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &ConversationDocument> {
        self.documents.values()
    }

    /// Insert or replace a document, indexing tokens from `full_text`, `project`, and
    /// the joined `top_keywords` terms (spec §4.4 "Fields indexed").
    pub fn add_document(&mut self, doc: ConversationDocument) {
        self.remove_document(&doc.id);

        let mut terms: HashSet<String> = doc.unique_terms.clone();
        terms.extend(tokenizer::tokenize(&doc.project));
        for (kw, _) in &doc.top_keywords {
            terms.extend(tokenizer::tokenize(kw));
        }

        for term in terms {
            self.vocabulary.insert(term.clone(), ());
            self.postings.entry(term).or_default().insert(doc.id.clone());
        }

        self.documents.insert(doc.id.clone(), doc);
    }

    /// Remove a document and drop it from every posting list it appeared in. Used
    /// before re-adding a changed document and when pruning stale entries.
    pub fn remove_document(&mut self, id: &str) {
        if self.documents.remove(id).is_none() {
            return;
        }
        for ids in self.postings.values_mut() {
            ids.remove(id);
        }
    }

    /// Exact token lookup: the posting list for `term`, if any.
    pub fn exact(&self, term: &str) -> HashSet<String> {
        self.postings.get(term).cloned().unwrap_or_default()
    }

    /// Prefix lookup: union of posting lists for every indexed token whose casefolded
    /// form starts with `prefix`.
    pub fn prefix(&self, prefix: &str) -> HashSet<String> {
        let mut out = HashSet::new();
        for (term, _) in self.vocabulary.range(prefix.to_string()..) {
            if !term.starts_with(prefix) {
                break;
            }
            if let Some(ids) = self.postings.get(term) {
                out.extend(ids.iter().cloned());
            }
        }
        out
    }

    /// Fuzzy lookup: union of posting lists for indexed tokens within edit distance
    /// `max_distance` of `term`. Candidates are pre-filtered by length difference so
    /// the Levenshtein computation stays sub-quadratic on realistic vocabularies.
    pub fn fuzzy(&self, term: &str, max_distance: usize) -> HashSet<String> {
        let mut out = HashSet::new();
        if max_distance == 0 {
            return out;
        }
        let term_len = term.chars().count();
        for (candidate, _) in self.vocabulary.iter() {
            let len_diff = term_len.abs_diff(candidate.chars().count());
            if len_diff > max_distance {
                continue;
            }
            if strsim::levenshtein(term, candidate) <= max_distance {
                if let Some(ids) = self.postings.get(candidate) {
                    out.extend(ids.iter().cloned());
                }
            }
        }
        out
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
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
            unique_terms: tokenizer::tokenize(text).into_iter().collect(),
        }
    }

    #[test]
    fn exact_lookup_returns_posting_list() {
        let mut s = SearchStructure::new();
        s.add_document(doc("d1", "hello world javascript"));
        assert_eq!(s.exact("javascript"), HashSet::from(["d1".to_string()]));
        assert!(s.exact("nonexistent").is_empty());
    }

    #[test]
    fn prefix_lookup_matches_all_extensions() {
        let mut s = SearchStructure::new();
        s.add_document(doc("d1", "learning javascript and javabeans"));
        let hits = s.prefix("java");
        assert_eq!(hits, HashSet::from(["d1".to_string()]));
    }

    #[test]
    fn fuzzy_lookup_within_distance() {
        let mut s = SearchStructure::new();
        s.add_document(doc("d1", "debugging session"));
        let hits = s.fuzzy("debuging", 1);
        assert!(hits.contains("d1"));
    }

    #[test]
    fn completeness_invariant_every_unique_term_indexed() {
        let mut s = SearchStructure::new();
        let d = doc("d1", "alpha beta gamma delta");
        let terms = d.unique_terms.clone();
        s.add_document(d);
        for term in terms {
            assert!(s.exact(&term).contains("d1"), "missing posting for {term}");
        }
    }

    #[test]
    fn remove_document_drops_all_postings() {
        let mut s = SearchStructure::new();
        s.add_document(doc("d1", "hello world javascript"));
        s.remove_document("d1");
        assert!(s.exact("javascript").is_empty());
        assert_eq!(s.document_count(), 0);
    }

    #[test]
    fn readding_replaces_not_duplicates() {
        let mut s = SearchStructure::new();
        s.add_document(doc("d1", "hello world"));
        s.add_document(doc("d1", "goodbye moon"));
        assert!(s.exact("hello").is_empty());
        assert!(s.exact("goodbye").contains("d1"));
        assert_eq!(s.document_count(), 1);
    }
}
