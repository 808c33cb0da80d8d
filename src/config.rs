use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ArchivistError, Result};

/// Top-level configuration loaded from `archivist.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchivistConfig {
    /// Root directory to scan for `<project>/*.jsonl` session files (supports `~`).
    pub sessions_dir: String,
    /// Directory the persisted index file and its lock live in (supports `~`).
    pub export_dir: String,
    /// Default log level when `RUST_LOG` is not set.
    pub log_level: String,

    pub tokenizer: TokenizerConfig,
    pub indexer: IndexerConfig,
    pub search: SearchConfig,
    pub freshness: FreshnessConfig,
}

impl Default for ArchivistConfig {
    fn default() -> Self {
        Self {
            sessions_dir: "~/.claude/projects".to_string(),
            export_dir: "~/.archivist".to_string(),
            log_level: "info".to_string(),
            tokenizer: TokenizerConfig::default(),
            indexer: IndexerConfig::default(),
            search: SearchConfig::default(),
            freshness: FreshnessConfig::default(),
        }
    }
}

impl ArchivistConfig {
    pub fn resolved_sessions_dir(&self) -> PathBuf {
        expand_tilde(&self.sessions_dir)
    }

    pub fn resolved_export_dir(&self) -> PathBuf {
        expand_tilde(&self.export_dir)
    }

    pub fn resolved_index_path(&self) -> PathBuf {
        self.resolved_export_dir().join("search-index-v2.json")
    }

    pub fn resolved_log_level(&self) -> &str {
        &self.log_level
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Minimum token length to keep, unless the token is in the tech-acronym allowlist.
    pub min_token_len: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self { min_token_len: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub verbose: bool,
    /// Number of session files parsed per batch before being folded into the index.
    pub batch_size: usize,
    /// Worker pool size for parallel parsing. 0 means "use available parallelism".
    pub workers: usize,
    /// Top-K keywords retained per document.
    pub top_keywords: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            batch_size: 20,
            workers: 0,
            top_keywords: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Results enriched with occurrences/highlights per query (the rest get stored fields only).
    pub enrich_top_n: usize,
    /// Minimum normalised score a candidate must clear to be returned.
    pub score_threshold: f64,
    /// Default result limit when the caller does not specify one.
    pub default_limit: usize,
    /// Maximum edit distance for fuzzy matches on tokens of length >= fuzzy_min_len.
    pub fuzzy_max_distance: usize,
    /// Minimum token length eligible for fuzzy matching at all.
    pub fuzzy_min_len: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enrich_top_n: 20,
            score_threshold: 0.01,
            default_limit: 20,
            fuzzy_max_distance: 1,
            fuzzy_min_len: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FreshnessConfig {
    /// If `document_count > archive_ratio * current_files`, treat the index as an archive.
    pub archive_ratio: f64,
    /// If `document_count / current_files` drops below this, rebuild.
    pub rebuild_ratio: f64,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            archive_ratio: 2.0,
            rebuild_ratio: 0.8,
        }
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Returns the default config file path: `~/.archivist/archivist.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".archivist")
        .join("archivist.toml")
}

/// Load configuration from a TOML file.
///
/// - If `path` is `Some`, reads that file (errors if missing or invalid).
/// - If `path` is `None`, tries the default path; returns defaults if the file doesn't exist.
pub fn load_config(path: Option<&Path>) -> Result<ArchivistConfig> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path(),
    };

    if !config_path.exists() {
        if path.is_some() {
            return Err(ArchivistError::ConfigMissing { path: config_path });
        }
        return Ok(ArchivistConfig::default());
    }

    let contents = std::fs::read_to_string(&config_path)?;
    let config: ArchivistConfig = toml::from_str(&contents)?;

    Ok(config)
}
