//! Freshness Controller (spec §4.7): decides whether a persisted index can be
//! reused, should be incrementally updated, needs a full rebuild, or should be
//! preserved as a historical archive.

use std::path::Path;

use crate::config::FreshnessConfig;
use crate::scanner::SessionFile;
use crate::search::PersistedIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Reuse,
    Update,
    Rebuild,
    Archive,
}

/// Decide the index's freshness against the current set of session files.
///
/// `index` is `None` when the index file doesn't exist or failed to parse (rule 1).
/// `index_mtime_ms` is the index file's own mtime, used for rule 2.
pub fn assess(
    index: Option<&PersistedIndex>,
    index_mtime_ms: Option<u64>,
    sessions: &[SessionFile],
    config: &FreshnessConfig,
) -> Freshness {
    let Some(index) = index else {
        return Freshness::Rebuild;
    };
    let Some(index_mtime_ms) = index_mtime_ms else {
        return Freshness::Rebuild;
    };

    if sessions.iter().any(|s| s.mtime_ms > index_mtime_ms) {
        return Freshness::Update;
    }

    let current_files = sessions.len();
    if current_files == 0 {
        // Nothing to compare against; an existing non-empty index is an archive.
        return if index.document_count > 0 {
            Freshness::Archive
        } else {
            Freshness::Reuse
        };
    }

    let document_count = index.document_count as f64;
    let current_files_f = current_files as f64;

    if document_count > config.archive_ratio * current_files_f {
        return Freshness::Archive;
    }

    if document_count / current_files_f < config.rebuild_ratio {
        return Freshness::Rebuild;
    }

    Freshness::Reuse
}

/// Convenience wrapper: load the index (if present) and the index file's mtime,
/// then call `assess`. Swallows `IndexCorrupt`/missing-file errors into `None` so
/// that corruption routes to `Freshness::Rebuild` per rule 1.
pub fn assess_path(
    index_path: &Path,
    sessions: &[SessionFile],
    config: &FreshnessConfig,
) -> Freshness {
    let index = crate::search::load_index(index_path).ok();
    let mtime_ms = std::fs::metadata(index_path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64);
    assess(index.as_ref(), mtime_ms, sessions, config)
}
