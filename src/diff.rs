//! Section-level comparison of two document versions.
//!
//! Documents are split on numbered section headers (`1`, `2.3`, `10.11.5` at
//! the start of a line), and blocks are compared key by key. This is the same
//! detector the analysis service runs server-side; having it in the crate
//! lets the CLI produce a raw diff without a backend.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, instrument};

/// Nature of a section-level change, derived purely from the old/new blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
    Unchanged,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::Added => "Added",
            ChangeKind::Removed => "Removed",
            ChangeKind::Modified => "Modified",
            ChangeKind::Unchanged => "Unchanged",
        };
        f.write_str(name)
    }
}

/// One raw detected change, before any classification or enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionChange {
    pub section: String,
    pub change_type: ChangeKind,
    pub old: String,
    pub new: String,
}

/// Parse a leading section number like `1`, `2.3` or `10.11.5` terminated by
/// whitespace or end-of-line. A trailing dot (`3.`) is malformed and yields
/// `None`.
pub fn parse_section_header(line: &str) -> Option<&str> {
    let bytes = line.as_bytes();
    let mut i = 0;
    if i >= bytes.len() || !bytes[i].is_ascii_digit() {
        return None;
    }
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    while i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        if i >= bytes.len() || !bytes[i].is_ascii_digit() {
            return None;
        }
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i == bytes.len() || bytes[i].is_ascii_whitespace() {
        Some(&line[..i])
    } else {
        None
    }
}

/// Split a document into section-number -> block-text. A block runs from its
/// header line up to (not including) the next header; preamble before the
/// first header is ignored, trailing newlines are trimmed from each block.
pub fn split_into_sections(text: &str) -> HashMap<String, String> {
    let mut sections = HashMap::new();
    let mut current: Option<String> = None;
    let mut block = String::new();

    for line in text.split_inclusive('\n') {
        if let Some(section) = parse_section_header(line) {
            if let Some(key) = current.take() {
                sections.insert(key, block.trim_end_matches('\n').to_string());
            }
            block.clear();
            block.push_str(line);
            current = Some(section.to_string());
        } else if current.is_some() {
            block.push_str(line);
        }
    }
    if let Some(key) = current {
        sections.insert(key, block.trim_end_matches('\n').to_string());
    }
    sections
}

/// Numeric ordering key: `"1.2.11"` -> `[1, 2, 11]`, so `1.10` sorts after
/// `1.9` instead of between `1.1` and `1.2`.
fn section_key(section: &str) -> Vec<u64> {
    section
        .split('.')
        .filter_map(|part| part.parse().ok())
        .collect()
}

/// Diff two documents at the section level. Returns Added/Removed/Modified
/// records in numeric section order; identical blocks produce nothing.
#[instrument(target = "regdelta::diff", skip(old_text, new_text))]
pub fn detect_section_changes(old_text: &str, new_text: &str) -> Vec<SectionChange> {
    let old_map = split_into_sections(old_text);
    let new_map = split_into_sections(new_text);

    let mut keys: Vec<&String> = old_map.keys().chain(new_map.keys()).collect();
    keys.sort_by_key(|key| section_key(key.as_str()));
    keys.dedup();

    let mut changes = Vec::new();
    for key in keys {
        match (old_map.get(key), new_map.get(key)) {
            (Some(old), None) => changes.push(SectionChange {
                section: key.clone(),
                change_type: ChangeKind::Removed,
                old: old.clone(),
                new: String::new(),
            }),
            (None, Some(new)) => changes.push(SectionChange {
                section: key.clone(),
                change_type: ChangeKind::Added,
                old: String::new(),
                new: new.clone(),
            }),
            (Some(old), Some(new)) if old != new => changes.push(SectionChange {
                section: key.clone(),
                change_type: ChangeKind::Modified,
                old: old.clone(),
                new: new.clone(),
            }),
            _ => {}
        }
    }
    debug!(
        target: "regdelta::diff",
        changes = changes.len(),
        "section diff complete"
    );
    changes
}

/// Classify a change from its old/new text alone. The analysis service uses
/// this to sanity-check the change type it was handed before prompting.
pub fn classify_change(old: &str, new: &str) -> ChangeKind {
    let (old, new) = (old.trim(), new.trim());
    if old.is_empty() && !new.is_empty() {
        ChangeKind::Added
    } else if !old.is_empty() && new.is_empty() {
        ChangeKind::Removed
    } else if old != new {
        ChangeKind::Modified
    } else {
        ChangeKind::Unchanged
    }
}
