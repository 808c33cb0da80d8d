use std::path::PathBuf;

/// Error kinds raised by the indexing and query core.
///
/// Parse-time problems (`LineMalformed`, `EmptyConversation`) are deliberately not
/// represented here — per the parser's contract they are recovered locally and
/// surfaced through `IndexReport`/`ParseOutcome` statistics, never as a `Result::Err`.
#[derive(Debug, thiserror::Error)]
pub enum ArchivistError {
    #[error("failed to read session file {path}: {source}")]
    SessionUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no search index found; run `archivist index` first")]
    IndexMissing,

    #[error("search index is corrupt: {reason}")]
    IndexCorrupt { reason: String },

    #[error("search index is locked by another writer")]
    IndexLocked,

    #[error("indexing was cancelled")]
    Cancelled,

    #[error("failed to walk session directory {path}: {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file not found: {path}")]
    ConfigMissing { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ArchivistError>;
