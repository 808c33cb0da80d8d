//! `SearchEngine`: the value a caller owns to drive indexing and querying (spec §9
//! "explicit `SearchEngine` value owned by the caller" replacing a global singleton).
//! Implements the language-neutral API surface of spec §6.4.

use std::time::Instant;

use crate::config::ArchivistConfig;
use crate::error::{ArchivistError, Result};
use crate::freshness::{self, Freshness};
use crate::indexer::{self, BuildOptions, IndexReport};
use crate::query::{self, QueryOptions, SearchResponse, SearchResult};
use crate::search::{PersistedIndex, SearchStructure};

pub struct SearchEngine {
    config: ArchivistConfig,
    structure: Option<SearchStructure>,
    built_at: Option<chrono::DateTime<chrono::Utc>>,
    index_version: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Stats {
    pub document_count: usize,
    pub index_size: u64,
    pub built_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: Option<u32>,
}

impl SearchEngine {
    pub fn new(config: ArchivistConfig) -> Self {
        Self {
            config,
            structure: None,
            built_at: None,
            index_version: None,
        }
    }

    /// Load the persisted index into memory if not already loaded. Fails with
    /// `IndexMissing`/`IndexCorrupt` rather than silently building (spec §6.4).
    pub fn ensure_loaded(&mut self) -> Result<()> {
        if self.structure.is_some() {
            return Ok(());
        }
        let index_path = self.config.resolved_index_path();
        let persisted: PersistedIndex = crate::search::load_index(&index_path)?;
        self.built_at = Some(persisted.built_at);
        self.index_version = Some(persisted.version);
        self.structure = Some(persisted.into_structure());
        Ok(())
    }

    /// Decide freshness against the current session-file set without loading the
    /// full index into memory (spec §4.7).
    pub fn freshness(&self) -> Freshness {
        let sessions = crate::scanner::scan(&self.config.resolved_sessions_dir()).unwrap_or_default();
        freshness::assess_path(&self.config.resolved_index_path(), &sessions, &self.config.freshness)
    }

    pub fn build(&mut self, opts: BuildOptions) -> Result<IndexReport> {
        let report = indexer::build(&self.config, opts)?;
        self.structure = None;
        self.built_at = None;
        self.index_version = None;
        Ok(report)
    }

    /// Build only if the Freshness Controller says to (reuse/archive skip the rebuild).
    pub fn update(&mut self) -> Result<IndexReport> {
        match self.freshness() {
            Freshness::Reuse | Freshness::Archive => {
                self.ensure_loaded()?;
                Ok(IndexReport::default())
            }
            Freshness::Update | Freshness::Rebuild => self.build(BuildOptions::default()),
        }
    }

    pub fn search(&mut self, query: &str, opts: QueryOptions) -> Result<SearchResponse> {
        self.ensure_loaded()?;
        let start = Instant::now();
        let structure = self.structure.as_ref().expect("ensure_loaded populated structure");
        let mut response = query::search(structure, query, &opts, &self.config.search, 0.0);
        response.search_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        Ok(response)
    }

    pub fn get_all(&mut self, limit: Option<usize>) -> Result<Vec<SearchResult>> {
        self.ensure_loaded()?;
        let structure = self.structure.as_ref().expect("ensure_loaded populated structure");
        Ok(query::get_all(structure, limit))
    }

    pub fn stats(&mut self) -> Result<Stats> {
        self.ensure_loaded()?;
        let structure = self.structure.as_ref().expect("ensure_loaded populated structure");
        let index_path = self.config.resolved_index_path();
        let index_size = std::fs::metadata(&index_path).map(|m| m.len()).unwrap_or(0);
        Ok(Stats {
            document_count: structure.document_count(),
            index_size,
            built_at: self.built_at,
            version: self.index_version,
        })
    }

    pub fn validate(&self) -> bool {
        indexer::validate(&self.config)
    }
}
