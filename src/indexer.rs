//! Indexer (spec §4.5): drives full and incremental builds — walks the session
//! tree, parses files in parallel batches, runs the Keyword Extractor once over the
//! assembled corpus, and atomically persists the result.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use rayon::prelude::*;

use crate::config::ArchivistConfig;
use crate::document::ConversationDocument;
use crate::error::Result;
use crate::keywords;
use crate::parser::{self, ParseOutcome};
use crate::scanner::{self, SessionFile};
use crate::search::{save_index, PersistedIndex, SearchStructure};

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub force: bool,
}

/// Summary statistics returned from a build (spec §4.5 step 8, §6.4 `build`).
#[derive(Debug, Default, Clone)]
pub struct IndexReport {
    pub documents: usize,
    pub skipped_empty: usize,
    pub errors: usize,
    pub recovered_lines: usize,
    pub index_size_bytes: u64,
    pub duration_ms: u64,
}

impl fmt::Display for IndexReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Index build complete in {} ms", self.duration_ms)?;
        writeln!(f, "  documents indexed : {}", self.documents)?;
        writeln!(f, "  empty (skipped)   : {}", self.skipped_empty)?;
        writeln!(f, "  parse errors      : {}", self.errors)?;
        writeln!(f, "  lines recovered   : {}", self.recovered_lines)?;
        write!(f, "  index size        : {} bytes", self.index_size_bytes)
    }
}

/// Run a full build: scan every session file under `config.sessions_dir`, parse it,
/// extract keywords over the whole corpus, and write the persisted index.
///
/// `force` is currently equivalent to always-rebuild; the Freshness Controller
/// (invoked by callers before reaching here, e.g. the CLI's `index` command) decides
/// whether `build` should even run.
pub fn build(config: &ArchivistConfig, _opts: BuildOptions) -> Result<IndexReport> {
    let start = Instant::now();
    let sessions_dir = config.resolved_sessions_dir();
    let sessions = scanner::scan(&sessions_dir)?;

    tracing::info!(count = sessions.len(), "indexer: discovered session files");

    let worker_count = if config.indexer.workers == 0 {
        rayon::current_num_threads()
    } else {
        config.indexer.workers
    };
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .build()
        .map_err(|e| crate::error::ArchivistError::IndexCorrupt {
            reason: format!("failed to build worker pool: {e}"),
        })?;

    let mut report = IndexReport::default();
    let mut documents: HashMap<String, ConversationDocument> = HashMap::new();

    for (batch_index, batch) in sessions.chunks(config.indexer.batch_size.max(1)).enumerate() {
        tracing::info!(batch = batch_index, files = batch.len(), "indexer: parsing batch");
        let parsed: Vec<(SessionFile, Result<ParseOutcome>)> = pool.install(|| {
            batch
                .par_iter()
                .map(|session| (session.clone(), parser::parse_session_file(&session.path)))
                .collect()
        });

        for (session, outcome) in parsed {
            match outcome {
                Ok(ParseOutcome::Document(parsed)) => {
                    report.errors += parsed.stats.parse_errors;
                    report.recovered_lines += parsed.stats.recovered;
                    let doc = ConversationDocument {
                        id: session.id.clone(),
                        project: session.project.clone(),
                        original_path: session.path.clone(),
                        modified: parsed.modified,
                        message_count: parsed.message_count,
                        word_count: parsed.word_count,
                        content_hash: parsed.content_hash,
                        full_text: parsed.full_text,
                        preview: parsed.preview,
                        tools_used: parsed.tools_used,
                        top_keywords: Vec::new(),
                        unique_terms: parsed.unique_terms,
                    };
                    documents.insert(doc.id.clone(), doc);
                    report.documents += 1;
                }
                Ok(ParseOutcome::Empty(stats)) => {
                    report.errors += stats.parse_errors;
                    report.skipped_empty += 1;
                    tracing::debug!(path = %session.path.display(), "indexer: empty conversation skipped");
                }
                Err(e) => {
                    report.errors += 1;
                    tracing::warn!(path = %session.path.display(), error = %e, "indexer: file unreadable, skipping");
                }
            }
        }
    }

    tracing::info!("indexer: extracting keywords over assembled corpus");
    let keyword_map = keywords::extract_keywords(&documents, config.indexer.top_keywords);
    for (id, kws) in keyword_map {
        if let Some(doc) = documents.get_mut(&id) {
            doc.top_keywords = kws;
        }
    }

    let mut structure = SearchStructure::new();
    for doc in documents.into_values() {
        structure.add_document(doc);
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    let persisted = PersistedIndex::from_structure(&structure, duration_ms);
    let index_path = config.resolved_export_dir().join("search-index-v2.json");

    let size_estimate = serde_json::to_vec(&persisted)?.len() as u64;
    save_index(&index_path, &persisted)?;

    report.duration_ms = duration_ms;
    report.index_size_bytes = size_estimate;

    tracing::info!(
        documents = report.documents,
        skipped = report.skipped_empty,
        errors = report.errors,
        duration_ms = report.duration_ms,
        "indexer: build complete"
    );

    Ok(report)
}

/// Validate that the persisted index at `config`'s index path loads and its
/// posting-list completeness invariant holds (spec §8.5) for a sample of documents.
pub fn validate(config: &ArchivistConfig) -> bool {
    let index_path = config.resolved_index_path();
    let Ok(persisted) = crate::search::load_index(&index_path) else {
        return false;
    };
    let structure = persisted.into_structure();
    structure
        .documents()
        .all(|doc| doc.unique_terms.iter().all(|term| structure.exact(term).contains(&doc.id)))
}
