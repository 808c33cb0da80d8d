//! Session Parser (spec §4.2): turns one JSONL file into a single conversation
//! document, or reports it as empty.

use std::collections::HashSet;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

use crate::error::{ArchivistError, Result};
use crate::models::SessionRecord;
use crate::tokenizer;

/// Best-effort recovery pattern for a malformed line that still looks like a
/// `role`/`content` record. No fidelity guarantee — recovered messages are counted
/// separately in diagnostics (spec §4.2 step 2a).
fn recovery_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""role"\s*:\s*"(user|assistant)"[\s\S]*?"text"\s*:\s*"((?:[^"\\]|\\.)*)""#)
            .expect("recovery pattern is valid")
    })
}

/// Statistics accumulated while parsing a single file.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParseStats {
    pub parse_errors: usize,
    pub recovered: usize,
}

/// The text-level result of parsing one session file, before the caller assigns
/// `id` and `project` (spec §4.2: "The caller assigns `id` and `project`").
pub struct ParsedSession {
    pub content_hash: String,
    pub modified: DateTime<Utc>,
    pub message_count: usize,
    pub word_count: usize,
    pub full_text: String,
    pub preview: String,
    pub tools_used: HashSet<String>,
    pub unique_terms: HashSet<String>,
    pub stats: ParseStats,
}

pub enum ParseOutcome {
    Document(ParsedSession),
    Empty(ParseStats),
}

/// Parse one JSONL session file.
pub fn parse_session_file(path: &Path) -> Result<ParseOutcome> {
    let bytes = std::fs::read(path).map_err(|source| ArchivistError::SessionUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    let content_hash = hash_bytes(&bytes);

    let mut stats = ParseStats::default();
    let mut full_text = String::new();
    let mut tools_used = HashSet::new();
    let mut message_count = 0usize;

    for line in BufReader::new(bytes.as_slice()).lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => continue,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<SessionRecord>(trimmed) {
            Ok(record) if record.contributes() => {
                let (text, tools) = record
                    .message
                    .as_ref()
                    .expect("contributes() guarantees a message")
                    .content
                    .extract();
                append_text(&mut full_text, &text);
                tools_used.extend(tools);
                message_count += 1;
            }
            Ok(_) => {
                // Valid JSON but not a contributing record (summary/meta/system/etc).
            }
            Err(_) => {
                stats.parse_errors += 1;
                if let Some(caps) = recovery_pattern().captures(trimmed) {
                    let text = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                    if !text.is_empty() {
                        append_text(&mut full_text, text);
                        message_count += 1;
                        stats.recovered += 1;
                    }
                }
            }
        }
    }

    if message_count == 0 {
        return Ok(ParseOutcome::Empty(stats));
    }

    let word_count = full_text.split_whitespace().count();
    let preview = crate::document::ConversationDocument::make_preview(&full_text);
    let unique_terms: HashSet<String> = tokenizer::tokenize(&full_text).into_iter().collect();

    Ok(ParseOutcome::Document(ParsedSession {
        content_hash,
        modified,
        message_count,
        word_count,
        full_text,
        preview,
        tools_used,
        unique_terms,
        stats,
    }))
}

fn append_text(full_text: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    full_text.push(' ');
    full_text.push_str(text);
}

/// SHA-256 digest of `bytes`, lower-case hex encoded.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
