//! On-disk persistence for the Search Structure (spec §6.2): a single self-contained
//! JSON document, written atomically via a temp file plus rename, guarded by an
//! advisory lock file so only one writer touches the index at a time.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::Path;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::config::ArchivistConfig;
use crate::document::ConversationDocument;
use crate::error::{ArchivistError, Result};

use super::SearchStructure;

/// Schema version of the persisted index file. A mismatch forces a rebuild rather
/// than attempting to interpret an incompatible layout (spec §6.2).
pub const INDEX_VERSION: u32 = 2;

#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedIndex {
    pub version: u32,
    pub built_at: DateTime<Utc>,
    pub build_duration_ms: u64,
    pub document_count: usize,
    pub documents: HashMap<String, ConversationDocument>,
}

impl PersistedIndex {
    pub fn from_structure(structure: &SearchStructure, build_duration_ms: u64) -> Self {
        let documents: HashMap<String, ConversationDocument> = structure
            .documents()
            .map(|d| (d.id.clone(), d.clone()))
            .collect();
        Self {
            version: INDEX_VERSION,
            built_at: Utc::now(),
            build_duration_ms,
            document_count: documents.len(),
            documents,
        }
    }

    /// Rebuild a queryable `SearchStructure` from persisted documents. Postings are
    /// re-derived from each document's `unique_terms`/`project`/`top_keywords` rather
    /// than stored directly, keeping the on-disk format self-contained (spec §6.2)
    /// without duplicating the inverted map in two places.
    pub fn into_structure(self) -> SearchStructure {
        let mut structure = SearchStructure::new();
        for doc in self.documents.into_values() {
            structure.add_document(doc);
        }
        structure
    }
}

fn lock_path(index_path: &Path) -> std::path::PathBuf {
    let mut p = index_path.as_os_str().to_owned();
    p.push(".lock");
    std::path::PathBuf::from(p)
}

fn tmp_path(index_path: &Path) -> std::path::PathBuf {
    let mut p = index_path.as_os_str().to_owned();
    p.push(".tmp");
    std::path::PathBuf::from(p)
}

/// Acquire the exclusive writer lock on `<index_path>.lock`, non-blocking. Returns
/// `IndexLocked` if another writer currently holds it.
fn acquire_writer_lock(index_path: &Path) -> Result<File> {
    if let Some(parent) = index_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .open(lock_path(index_path))?;
    lock_file.try_lock_exclusive().map_err(|_| ArchivistError::IndexLocked)?;
    Ok(lock_file)
}

/// Write `index` atomically to `index_path`: serialize to a `.tmp` sibling, then
/// rename over the target (spec §4.5 step 7, §6.2, invariant §8.6).
pub fn save_index(index_path: &Path, index: &PersistedIndex) -> Result<()> {
    let lock_file = acquire_writer_lock(index_path)?;

    let tmp = tmp_path(index_path);
    let json = serde_json::to_vec_pretty(index)?;
    fs::write(&tmp, json)?;
    fs::rename(&tmp, index_path)?;

    FileExt::unlock(&lock_file).ok();
    Ok(())
}

/// Load the persisted index from `index_path`. A version mismatch or malformed JSON
/// surfaces as `IndexCorrupt` so the Freshness Controller can treat it as "rebuild".
pub fn load_index(index_path: &Path) -> Result<PersistedIndex> {
    if !index_path.exists() {
        return Err(ArchivistError::IndexMissing);
    }
    let contents = fs::read_to_string(index_path).map_err(|source| ArchivistError::SessionUnreadable {
        path: index_path.to_path_buf(),
        source,
    })?;
    let index: PersistedIndex = serde_json::from_str(&contents).map_err(|e| ArchivistError::IndexCorrupt {
        reason: e.to_string(),
    })?;
    if index.version != INDEX_VERSION {
        return Err(ArchivistError::IndexCorrupt {
            reason: format!("unsupported index version {} (expected {})", index.version, INDEX_VERSION),
        });
    }
    Ok(index)
}

/// Write a minimal default config file at `path`, creating parent directories.
/// Used by the `archivist init` CLI command.
pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let default = ArchivistConfig::default();
    let toml_str = toml::to_string_pretty(&default).unwrap_or_default();
    fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ConversationDocument;
    use std::collections::HashSet;
    use std::path::PathBuf as StdPathBuf;
    use tempfile::TempDir;

    fn sample_doc(id: &str) -> ConversationDocument {
        ConversationDocument {
            id: id.to_string(),
            project: "demo".to_string(),
            original_path: StdPathBuf::from(format!("/tmp/{id}.jsonl")),
            modified: Utc::now(),
            message_count: 1,
            word_count: 2,
            content_hash: "hash".to_string(),
            full_text: "hello world".to_string(),
            preview: "hello world".to_string(),
            tools_used: HashSet::new(),
            top_keywords: Vec::new(),
            unique_terms: HashSet::from(["hello".to_string(), "world".to_string()]),
        }
    }

    #[test]
    fn round_trip_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let index_path = tmp.path().join("search-index-v2.json");

        let mut structure = SearchStructure::new();
        structure.add_document(sample_doc("d1"));
        let persisted = PersistedIndex::from_structure(&structure, 42);
        save_index(&index_path, &persisted).unwrap();

        let loaded = load_index(&index_path).unwrap();
        assert_eq!(loaded.document_count, 1);
        assert_eq!(loaded.version, INDEX_VERSION);

        let restored = loaded.into_structure();
        assert!(restored.exact("hello").contains("d1"));
    }

    #[test]
    fn missing_index_reports_index_missing() {
        let tmp = TempDir::new().unwrap();
        let index_path = tmp.path().join("nope.json");
        let err = load_index(&index_path).unwrap_err();
        assert!(matches!(err, ArchivistError::IndexMissing));
    }

    #[test]
    fn corrupt_index_reports_index_corrupt() {
        let tmp = TempDir::new().unwrap();
        let index_path = tmp.path().join("search-index-v2.json");
        fs::write(&index_path, "not json").unwrap();
        let err = load_index(&index_path).unwrap_err();
        assert!(matches!(err, ArchivistError::IndexCorrupt { .. }));
    }

    #[test]
    fn no_tmp_file_left_after_successful_save() {
        let tmp = TempDir::new().unwrap();
        let index_path = tmp.path().join("search-index-v2.json");
        let structure = SearchStructure::new();
        let persisted = PersistedIndex::from_structure(&structure, 0);
        save_index(&index_path, &persisted).unwrap();
        assert!(!tmp_path(&index_path).exists());
    }
}
