//! Discovers candidate session files under a root directory (spec §4.5 step 1, §6.1).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ArchivistError, Result};

/// A discovered session file: `<root>/<project>/<uuid>.jsonl`.
#[derive(Debug, Clone)]
pub struct SessionFile {
    pub path: PathBuf,
    pub project: String,
    pub id: String,
    pub mtime_ms: u64,
    pub size_bytes: u64,
}

fn uuid_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
        )
        .expect("uuid pattern is valid")
    })
}

/// Recursively scan `root` for `.jsonl` files. Each file's `project` is the name of
/// its parent directory relative to `root` (spec §3.2); files that sit directly
/// under `root` are assigned the project name `"default"`. Entries are sorted by
/// path for deterministic batch ordering.
pub fn scan(root: &Path) -> Result<Vec<SessionFile>> {
    let mut entries = Vec::new();
    if root.exists() {
        walk_dir(root, root, &mut entries)?;
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::info!("scan: {} session files under {}", entries.len(), root.display());
    Ok(entries)
}

fn walk_dir(root: &Path, dir: &Path, entries: &mut Vec<SessionFile>) -> Result<()> {
    let read_dir = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            tracing::warn!("permission denied: {}", dir.display());
            return Ok(());
        }
        Err(source) => {
            return Err(ArchivistError::DirectoryUnreadable { path: dir.to_path_buf(), source })
        }
    };

    for entry in read_dir {
        let entry = entry.map_err(|source| ArchivistError::DirectoryUnreadable {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|source| ArchivistError::DirectoryUnreadable {
            path: path.clone(),
            source,
        })?;

        if file_type.is_dir() {
            walk_dir(root, &path, entries)?;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !uuid_pattern().is_match(stem) {
            continue;
        }

        let metadata = entry.metadata().map_err(|source| ArchivistError::DirectoryUnreadable {
            path: path.clone(),
            source,
        })?;
        let mtime_ms = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let project = path
            .parent()
            .filter(|p| *p != root)
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "default".to_string());

        entries.push(SessionFile {
            path,
            project,
            id: stem.to_string(),
            mtime_ms,
            size_bytes: metadata.len(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, "{}").unwrap();
    }

    const UUID1: &str = "aaaaaaaa-aaaa-4aaa-aaaa-aaaaaaaaaaaa";
    const UUID2: &str = "bbbbbbbb-bbbb-4bbb-bbbb-bbbbbbbbbbbb";

    #[test]
    fn finds_jsonl_files_with_uuid_names() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), &format!("proj1/{UUID1}.jsonl"));
        touch(tmp.path(), &format!("proj1/not-a-uuid.jsonl"));
        touch(tmp.path(), &format!("proj1/{UUID2}.txt"));

        let entries = scan(tmp.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, UUID1);
        assert_eq!(entries[0].project, "proj1");
    }

    #[test]
    fn root_level_files_get_default_project() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), &format!("{UUID1}.jsonl"));

        let entries = scan(tmp.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].project, "default");
    }

    #[test]
    fn missing_root_returns_empty_not_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("does-not-exist");
        let entries = scan(&missing).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn sorted_by_path() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), &format!("z/{UUID1}.jsonl"));
        touch(tmp.path(), &format!("a/{UUID2}.jsonl"));
        let entries = scan(tmp.path()).unwrap();
        assert!(entries[0].path < entries[1].path);
    }
}
