//! Query Engine (spec §4.6): parses a query, retrieves and ranks candidates, and
//! enriches the top results with occurrence positions and highlighted previews.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::config::SearchConfig;
use crate::document::ConversationDocument;
use crate::search::SearchStructure;
use crate::tokenizer;

pub const HIGHLIGHT_OPEN: &str = "[HIGHLIGHT]";
pub const HIGHLIGHT_CLOSE: &str = "[/HIGHLIGHT]";

const PREVIEW_RADIUS: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub limit: Option<usize>,
    pub project_filter: Option<String>,
}

/// One matched position in `full_text`: `(start_offset, length, matched_word, query_word)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub start_offset: usize,
    pub length: usize,
    pub matched_word: String,
    pub query_word: String,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub id: String,
    pub project: String,
    pub modified: DateTime<Utc>,
    pub message_count: usize,
    pub preview: String,
    pub score: f64,
    pub occurrences: Vec<Occurrence>,
    pub current_occurrence_index: usize,
    pub query_words: Vec<String>,
    pub query_phrases: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total_found: usize,
    pub search_time_ms: f64,
}

struct ParsedQuery {
    terms: Vec<String>,
    phrases: Vec<String>,
}

fn phrase_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]+)""#).expect("phrase pattern is valid"))
}

fn parse_query(query: &str) -> ParsedQuery {
    let mut phrases = Vec::new();
    let mut remainder = query.to_string();
    for caps in phrase_pattern().captures_iter(query) {
        if let Some(m) = caps.get(1) {
            phrases.push(m.as_str().to_string());
        }
    }
    // Strip quoted spans before tokenising the remainder for required terms.
    remainder = phrase_pattern().replace_all(&remainder, " ").to_string();
    let terms = tokenizer::tokenize(&remainder);
    ParsedQuery { terms, phrases }
}

/// Evaluate `query` against `structure`, returning a ranked, enriched result set.
/// Never fails: invalid or empty queries produce an empty response (spec §7).
pub fn search(
    structure: &SearchStructure,
    query: &str,
    opts: &QueryOptions,
    config: &SearchConfig,
    elapsed_ms: f64,
) -> SearchResponse {
    let parsed = parse_query(query);
    if parsed.terms.is_empty() && parsed.phrases.is_empty() {
        return SearchResponse {
            results: Vec::new(),
            total_found: 0,
            search_time_ms: elapsed_ms,
        };
    }

    let candidates = retrieve_candidates(structure, &parsed, config);
    let mut scored: Vec<(f64, &ConversationDocument)> = candidates
        .iter()
        .filter_map(|id| structure.get_document(id))
        .filter(|doc| {
            opts.project_filter
                .as_ref()
                .map(|p| &doc.project == p)
                .unwrap_or(true)
        })
        .filter(|doc| phrase_match(doc, &parsed.phrases))
        .map(|doc| (score(doc, &parsed, config), doc))
        .filter(|(score, _)| *score >= config.score_threshold)
        .collect();

    scored.sort_by(|(score_a, doc_a), (score_b, doc_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| doc_b.modified.cmp(&doc_a.modified))
            .then_with(|| doc_a.id.cmp(&doc_b.id))
    });

    let total_found = scored.len();
    let limit = opts.limit.unwrap_or(config.default_limit);
    scored.truncate(limit);

    let results = scored
        .into_iter()
        .enumerate()
        .map(|(rank, (score, doc))| {
            if rank < config.enrich_top_n {
                enrich(doc, score, &parsed)
            } else {
                bare_result(doc, score, &parsed)
            }
        })
        .collect();

    SearchResponse {
        results,
        total_found,
        search_time_ms: elapsed_ms,
    }
}

fn retrieve_candidates(structure: &SearchStructure, parsed: &ParsedQuery, config: &SearchConfig) -> HashSet<String> {
    let mut per_term_hits: Vec<HashSet<String>> = Vec::new();

    for term in &parsed.terms {
        let mut hits = structure.exact(term);
        hits.extend(structure.prefix(term));
        if term.chars().count() >= config.fuzzy_min_len {
            hits.extend(structure.fuzzy(term, config.fuzzy_max_distance));
        }
        per_term_hits.push(hits);
    }

    if parsed.terms.is_empty() {
        // Phrase-only query: treat every document as a candidate, phrase filter below decides.
        return structure.documents().map(|d| d.id.clone()).collect();
    }

    let mut result = per_term_hits[0].clone();
    for hits in &per_term_hits[1..] {
        result.retain(|id| hits.contains(id));
    }
    result
}

fn phrase_match(doc: &ConversationDocument, phrases: &[String]) -> bool {
    let haystack = doc.full_text.to_lowercase();
    phrases.iter().all(|p| haystack.contains(&p.to_lowercase()))
}

fn score(doc: &ConversationDocument, parsed: &ParsedQuery, config: &SearchConfig) -> f64 {
    let full_text_lower = doc.full_text.to_lowercase();
    let preview_lower = doc.preview.to_lowercase();
    let project_lower = doc.project.to_lowercase();
    let keyword_terms: HashSet<String> = doc
        .top_keywords
        .iter()
        .map(|(k, _)| k.to_lowercase())
        .collect();

    let mut raw = 0.0f64;
    let max_per_term = 10.0 + 20.0 + 3.0 + 5.0 + 2.0;
    let unit_count = parsed.terms.len() + parsed.phrases.len();
    let theoretical_max = max_per_term * unit_count.max(1) as f64;

    for term in &parsed.terms {
        if keyword_terms.contains(term) {
            raw += 10.0;
        }
        let tf = full_text_lower.matches(term.as_str()).count() as f64;
        raw += tf.min(20.0);
        if preview_lower.contains(term.as_str()) {
            raw += 3.0;
        }
        if project_lower.contains(term.as_str()) {
            raw += 5.0;
        }
        raw += 2.0 * structure_non_exact_bonus(doc, term, config) as f64;
    }

    // Phrases are guaranteed present by the `phrase_match` post-filter (spec §4.6), but
    // still need their own contribution here or a phrase-only query always scores 0.
    for phrase in &parsed.phrases {
        let phrase_lower = phrase.to_lowercase();
        let tf = full_text_lower.matches(phrase_lower.as_str()).count() as f64;
        raw += tf.min(20.0);
        if preview_lower.contains(phrase_lower.as_str()) {
            raw += 3.0;
        }
        if project_lower.contains(phrase_lower.as_str()) {
            raw += 5.0;
        }
    }

    (raw / theoretical_max).clamp(0.0, 1.0)
}

fn structure_non_exact_bonus(doc: &ConversationDocument, term: &str, config: &SearchConfig) -> usize {
    doc.top_keywords
        .iter()
        .filter(|(kw, _)| {
            let kw_lower = kw.to_lowercase();
            kw_lower != term
                && (kw_lower.starts_with(term) || strsim::levenshtein(term, &kw_lower) <= config.fuzzy_max_distance)
        })
        .count()
}

fn occurrence_pattern(term: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i)\b({}\w*)", regex::escape(term))).ok()
}

fn find_occurrences(full_text: &str, parsed: &ParsedQuery) -> Vec<Occurrence> {
    let mut occurrences = Vec::new();

    for term in &parsed.terms {
        if let Some(re) = occurrence_pattern(term) {
            for m in re.find_iter(full_text) {
                occurrences.push(Occurrence {
                    start_offset: m.start(),
                    length: m.len(),
                    matched_word: m.as_str().to_string(),
                    query_word: term.clone(),
                });
            }
        }
    }

    for phrase in &parsed.phrases {
        let lower_text = full_text.to_lowercase();
        let lower_phrase = phrase.to_lowercase();
        let mut start = 0;
        while let Some(pos) = lower_text[start..].find(&lower_phrase) {
            let offset = start + pos;
            occurrences.push(Occurrence {
                start_offset: offset,
                length: phrase.len(),
                matched_word: full_text[offset..offset + phrase.len()].to_string(),
                query_word: phrase.clone(),
            });
            start = offset + phrase.len().max(1);
        }
    }

    occurrences.sort_by_key(|o| o.start_offset);
    occurrences
}

/// Build the initial highlighted preview around the occurrence at `index` (spec §4.6 step 4).
pub fn build_preview(full_text: &str, occurrences: &[Occurrence], index: usize) -> String {
    let Some(occ) = occurrences.get(index) else {
        return crate::document::ConversationDocument::make_preview(full_text);
    };

    let start = occ.start_offset.saturating_sub(PREVIEW_RADIUS);
    let end = (occ.start_offset + occ.length + PREVIEW_RADIUS).min(full_text.len());
    let slice = &full_text[char_floor(full_text, start)..char_ceil(full_text, end)];

    let local_offset = occ.start_offset - char_floor(full_text, start);
    let mut preview = String::new();
    if start > 0 {
        preview.push_str("...");
    }
    preview.push_str(&slice[..local_offset.min(slice.len())]);
    preview.push_str(HIGHLIGHT_OPEN);
    let match_end = (local_offset + occ.length).min(slice.len());
    preview.push_str(&slice[local_offset.min(slice.len())..match_end]);
    preview.push_str(HIGHLIGHT_CLOSE);
    preview.push_str(&slice[match_end..]);
    if end < full_text.len() {
        preview.push_str("...");
    }
    preview
}

fn char_floor(s: &str, byte_idx: usize) -> usize {
    let mut idx = byte_idx.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn char_ceil(s: &str, byte_idx: usize) -> usize {
    let mut idx = byte_idx.min(s.len());
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

fn enrich(doc: &ConversationDocument, score: f64, parsed: &ParsedQuery) -> SearchResult {
    let occurrences = find_occurrences(&doc.full_text, parsed);
    let preview = if occurrences.is_empty() {
        doc.preview.clone()
    } else {
        build_preview(&doc.full_text, &occurrences, 0)
    };

    SearchResult {
        id: doc.id.clone(),
        project: doc.project.clone(),
        modified: doc.modified,
        message_count: doc.message_count,
        preview,
        score,
        occurrences,
        current_occurrence_index: 0,
        query_words: parsed.terms.clone(),
        query_phrases: parsed.phrases.clone(),
    }
}

fn bare_result(doc: &ConversationDocument, score: f64, parsed: &ParsedQuery) -> SearchResult {
    SearchResult {
        id: doc.id.clone(),
        project: doc.project.clone(),
        modified: doc.modified,
        message_count: doc.message_count,
        preview: doc.preview.clone(),
        score,
        occurrences: Vec::new(),
        current_occurrence_index: 0,
        query_words: parsed.terms.clone(),
        query_phrases: parsed.phrases.clone(),
    }
}

/// Move the navigation cursor to the next occurrence, if any (spec §9 "external
/// collaborator does arithmetic on occurrences without re-searching").
pub fn next_occurrence(result: &mut SearchResult) -> Option<&Occurrence> {
    if result.current_occurrence_index + 1 < result.occurrences.len() {
        result.current_occurrence_index += 1;
    }
    result.occurrences.get(result.current_occurrence_index)
}

pub fn previous_occurrence(result: &mut SearchResult) -> Option<&Occurrence> {
    if result.current_occurrence_index > 0 {
        result.current_occurrence_index -= 1;
    }
    result.occurrences.get(result.current_occurrence_index)
}

/// All stored documents as results with relevance 1.0 (spec §6.4 `get_all`).
pub fn get_all(structure: &SearchStructure, limit: Option<usize>) -> Vec<SearchResult> {
    let mut docs: Vec<&ConversationDocument> = structure.documents().collect();
    docs.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.id.cmp(&b.id)));
    if let Some(limit) = limit {
        docs.truncate(limit);
    }
    docs.into_iter()
        .map(|doc| SearchResult {
            id: doc.id.clone(),
            project: doc.project.clone(),
            modified: doc.modified,
            message_count: doc.message_count,
            preview: doc.preview.clone(),
            score: 1.0,
            occurrences: Vec::new(),
            current_occurrence_index: 0,
            query_words: Vec::new(),
            query_phrases: Vec::new(),
        })
        .collect()
}
