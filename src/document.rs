//! The canonical, normalised representation of one session (spec §3.2) and the
//! in-memory store that owns documents while the indexer builds the search structure.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of characters kept in a document's preview before the `...` suffix.
pub const PREVIEW_LEN: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDocument {
    pub id: String,
    pub project: String,
    pub original_path: PathBuf,
    pub modified: DateTime<Utc>,
    pub message_count: usize,
    pub word_count: usize,
    /// Lowercase hex SHA-256 digest of the raw JSONL bytes.
    pub content_hash: String,
    pub full_text: String,
    pub preview: String,
    pub tools_used: HashSet<String>,
    pub top_keywords: Vec<(String, f64)>,
    pub unique_terms: HashSet<String>,
}

impl ConversationDocument {
    /// Build the `preview` field: first `PREVIEW_LEN` chars of `full_text`, suffixed `...`
    /// when truncated.
    pub fn make_preview(full_text: &str) -> String {
        let mut chars = full_text.chars();
        let head: String = chars.by_ref().take(PREVIEW_LEN).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

/// In-memory mapping from stable conversation id to document, owned by whichever
/// process instance is indexing. Documents are immutable once stored for a given
/// `content_hash`; re-inserting with a new hash replaces the prior entry.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: HashMap<String, ConversationDocument>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document. Returns the previous document, if any, so callers
    /// can decide whether the content actually changed.
    pub fn insert(&mut self, doc: ConversationDocument) -> Option<ConversationDocument> {
        self.documents.insert(doc.id.clone(), doc)
    }

    pub fn get(&self, id: &str) -> Option<&ConversationDocument> {
        self.documents.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ConversationDocument> {
        self.documents.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationDocument> {
        self.documents.values()
    }

    pub fn into_documents(self) -> HashMap<String, ConversationDocument> {
        self.documents
    }

    pub fn from_documents(documents: HashMap<String, ConversationDocument>) -> Self {
        Self { documents }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_under_limit_has_no_suffix() {
        let p = ConversationDocument::make_preview("hello world");
        assert_eq!(p, "hello world");
    }

    #[test]
    fn preview_over_limit_truncates_and_suffixes() {
        let text = "a".repeat(250);
        let p = ConversationDocument::make_preview(&text);
        assert_eq!(p.len(), PREVIEW_LEN + 3);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn store_replaces_existing_document_by_id() {
        let mut store = DocumentStore::new();
        let mut doc = sample_doc("s1", "hash1");
        store.insert(doc.clone());
        doc.content_hash = "hash2".to_string();
        doc.full_text = "updated text".to_string();
        store.insert(doc.clone());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("s1").unwrap().content_hash, "hash2");
    }

    fn sample_doc(id: &str, hash: &str) -> ConversationDocument {
        ConversationDocument {
            id: id.to_string(),
            project: "demo".to_string(),
            original_path: PathBuf::from(format!("/tmp/{id}.jsonl")),
            modified: Utc::now(),
            message_count: 1,
            word_count: 2,
            content_hash: hash.to_string(),
            full_text: "hello world".to_string(),
            preview: "hello world".to_string(),
            tools_used: HashSet::new(),
            top_keywords: Vec::new(),
            unique_terms: HashSet::new(),
        }
    }
}
