//! Canonical journal entry blocks.
//!
//! A block as written into the note:
//!
//! ```text
//! ---
//! ### Prompt 3
//!
//! > first prompt line
//! > second prompt line
//!
//! ### AI Response
//!
//! response text
//!
//! *Metadata: Model: OpenAI: gpt-4o, Total Tokens: 210 (Context: 31)*
//! ```
//!
//! Parsing works line by line over a small grammar: prompt header, quoted
//! prompt section, response header, response body, metadata annotation.
//! A response body ends at its metadata line or at the next prompt header.
//! A separator ends it only when it is followed by a prompt header, or when no
//! metadata line is left before the next prompt header and the separator is
//! followed by a top-level section heading or the end of the text. Any other
//! `---` line stays inside the response.

use crate::types::JournalEntry;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

static PROMPT_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^###\s+Prompt\s+(\d+)\s*$").expect("prompt header pattern"));
static RESPONSE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^###\s+AI Response\s*$").expect("response header pattern"));
static METADATA_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*Metadata:[^*]*\*").expect("metadata pattern"));
static MODEL_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Model:\s*([^,*]+)").expect("model field pattern"));
static TOTAL_TOKENS_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Total Tokens:\s*(\d+)").expect("total tokens pattern"));
static CONTEXT_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Context:\s*(\d+)").expect("context pattern"));

/// Usage annotation attached to a persisted exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    pub(crate) model: String,
    pub(crate) total_tokens: u64,
    pub(crate) context_tokens: u64,
}

/// Fields recovered from a `*Metadata: ...*` annotation. Missing fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryUsage {
    pub(crate) model: Option<String>,
    pub(crate) total_tokens: Option<u64>,
    pub(crate) context_tokens: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParseWarning {
    /// A prompt header with no `### AI Response` section before the next block.
    MissingResponse { id: u32, line: usize },
    /// A header number already used by an earlier block.
    DuplicateId { id: u32 },
    /// The header number does not match the block's position in the note.
    OutOfSequence { position: usize, id: u32 },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingResponse { id, line } => {
                write!(f, "Prompt {id} (line {line}) has no AI Response section; skipped")
            }
            Self::DuplicateId { id } => write!(f, "Prompt number {id} appears more than once"),
            Self::OutOfSequence { position, id } => write!(f, "Entry {position} is numbered {id}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub(crate) entries: Vec<JournalEntry>,
    pub(crate) warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    Separator,
    PromptHeader(u32),
    ResponseHeader,
    Metadata(&'a str),
    Section,
    Blank,
    Text,
}

fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }
    if trimmed == "---" {
        return Line::Separator;
    }
    if let Some(captures) = PROMPT_HEADER.captures(trimmed) {
        if let Ok(id) = captures[1].parse::<u32>() {
            return Line::PromptHeader(id);
        }
    }
    if RESPONSE_HEADER.is_match(trimmed) {
        return Line::ResponseHeader;
    }
    if trimmed.starts_with("*Metadata:") {
        if let Some(found) = METADATA_LINE.find(trimmed) {
            return Line::Metadata(found.as_str());
        }
    }
    if trimmed.starts_with("# ") || trimmed.starts_with("## ") {
        return Line::Section;
    }
    Line::Text
}

/// Render one exchange as a block ready to append to the note.
pub fn serialize(index: usize, prompt: &str, response: &str, metadata: &EntryMetadata) -> String {
    let quoted = prompt.replace("\r\n", "\n").replace('\n', "\n> ");
    format!(
        "\n---\n### Prompt {index}\n\n> {quoted}\n\n### AI Response\n\n{response}\n\n{}\n",
        render_metadata(metadata)
    )
}

pub fn render_metadata(metadata: &EntryMetadata) -> String {
    format!(
        "*Metadata: Model: {}, Total Tokens: {} (Context: {})*",
        metadata.model, metadata.total_tokens, metadata.context_tokens
    )
}

pub fn parse(document: &str) -> Vec<JournalEntry> {
    parse_with_report(document).entries
}

/// Parse every recognized block and collect structural warnings. Warnings are
/// also logged; ids are never renumbered.
pub fn parse_with_report(document: &str) -> ParseReport {
    let lines: Vec<&str> = document.lines().collect();
    let mut report = ParseReport::default();

    let mut index = 0;
    while index < lines.len() {
        match classify(lines[index]) {
            Line::PromptHeader(id) => {
                let (entry, next) = parse_block(&lines, index, id);
                match entry {
                    Some(entry) => report.entries.push(entry),
                    None => report
                        .warnings
                        .push(ParseWarning::MissingResponse { id, line: index + 1 }),
                }
                index = next;
            }
            _ => index += 1,
        }
    }

    let mut seen = HashSet::new();
    for (position, entry) in report.entries.iter().enumerate() {
        if !seen.insert(entry.id) {
            report.warnings.push(ParseWarning::DuplicateId { id: entry.id });
        } else if entry.id as usize != position + 1 {
            report.warnings.push(ParseWarning::OutOfSequence {
                position: position + 1,
                id: entry.id,
            });
        }
    }

    for warning in &report.warnings {
        warn!(%warning, "journal structure warning");
    }
    report
}

fn parse_block(lines: &[&str], header: usize, id: u32) -> (Option<JournalEntry>, usize) {
    let mut cursor = header + 1;
    let mut prompt_lines = Vec::new();

    loop {
        let Some(line) = lines.get(cursor) else {
            return (None, cursor);
        };
        match classify(line) {
            Line::ResponseHeader => {
                cursor += 1;
                break;
            }
            Line::PromptHeader(_) | Line::Section => return (None, cursor),
            _ => {
                prompt_lines.push(strip_quote(line));
                cursor += 1;
            }
        }
    }

    let mut response_lines = Vec::new();
    let mut metadata_text = String::new();
    while let Some(line) = lines.get(cursor) {
        match classify(line) {
            Line::Metadata(found) => {
                metadata_text = found.to_string();
                cursor += 1;
                break;
            }
            Line::PromptHeader(_) => break,
            Line::Separator if closes_block(lines, cursor + 1) => break,
            _ => {
                response_lines.push(*line);
                cursor += 1;
            }
        }
    }

    let entry = JournalEntry {
        id,
        prompt: prompt_lines.join("\n").trim().to_string(),
        response: response_lines.join("\n").trim().to_string(),
        metadata_text,
    };
    (Some(entry), cursor)
}

fn closes_block(lines: &[&str], from: usize) -> bool {
    let rest = &lines[from.min(lines.len())..];
    let metadata_ahead = rest
        .iter()
        .map(|line| classify(line))
        .take_while(|line| !matches!(line, Line::PromptHeader(_)))
        .any(|line| matches!(line, Line::Metadata(_)));
    if metadata_ahead {
        return false;
    }
    for line in rest {
        match classify(line) {
            Line::Blank => continue,
            Line::PromptHeader(_) | Line::Section => return true,
            _ => return false,
        }
    }
    true
}

fn strip_quote(line: &str) -> &str {
    match line.strip_prefix('>') {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => line,
    }
}

/// Number of prompt headers in the note. Matches `parse(..).len()` when every
/// header opens a complete block.
pub fn count_existing_prompts(document: &str) -> usize {
    document
        .lines()
        .filter(|line| matches!(classify(line), Line::PromptHeader(_)))
        .count()
}

pub fn next_prompt_index(document: &str) -> usize {
    count_existing_prompts(document) + 1
}

pub fn extract_usage(metadata_text: &str) -> EntryUsage {
    EntryUsage {
        model: MODEL_FIELD
            .captures(metadata_text)
            .map(|captures| captures[1].trim().to_string())
            .filter(|model| !model.is_empty()),
        total_tokens: TOTAL_TOKENS_FIELD
            .captures(metadata_text)
            .and_then(|captures| captures[1].parse().ok()),
        context_tokens: CONTEXT_FIELD
            .captures(metadata_text)
            .and_then(|captures| captures[1].parse().ok()),
    }
}

impl JournalEntry {
    pub(crate) fn usage(&self) -> EntryUsage {
        extract_usage(&self.metadata_text)
    }
}
