//! Metadata carried by `[metadata]: # (Key: value)` definitions.
//!
//! A todo's metadata lives in definitions directly inside its list item. The
//! extractor collects them for a detected range, optionally seeded with the
//! metadata of the todo's ancestors, and reports which lines it consumed so the
//! exported body can leave them out.

pub mod codec;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parsing::{Flattened, NodeKind, ParsedNode};
use crate::todo::{DEFAULT_MIN_TODO_LEVEL, TodoRange, is_todo};

pub use codec::{
    FRONT_MATTER_MARKER, decode_payload, encode_front_matter, encode_payload, split_front_matter,
};

/// Definition label reserved for metadata, compared case-insensitively.
pub const METADATA_IDENTIFIER: &str = "metadata";

pub mod keys {
    pub const TAGS: &str = "Tags";
    pub const FOLDER_PATH: &str = "FolderPath";
    pub const TITLE: &str = "Title";
    pub const FILE_NAME: &str = "FileName";
    pub const APPEND_MODE: &str = "AppendMode";
    pub const CREATED_DATE: &str = "CreatedDate";
    pub const COMPLETED_DATE: &str = "CompletedDate";
}

pub const DEFAULT_METADATA_KEYS: [&str; 7] = [
    keys::TAGS,
    keys::FOLDER_PATH,
    keys::TITLE,
    keys::FILE_NAME,
    keys::APPEND_MODE,
    keys::CREATED_DATE,
    keys::COMPLETED_DATE,
];

pub fn default_keys() -> Vec<String> {
    DEFAULT_METADATA_KEYS.iter().map(|key| key.to_string()).collect()
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("Malformed metadata on line {}: {reason}", .line + 1)]
    Malformed {
        /// 0-indexed line of the offending definition.
        line: usize,
        reason: String,
    },

    #[error("Failed to encode metadata: {reason}")]
    Encode { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    List(Vec<String>),
}

impl MetadataValue {
    /// Empty text and empty lists are template placeholders, not values.
    pub fn is_blank(&self) -> bool {
        match self {
            MetadataValue::Text(text) => text.trim().is_empty(),
            MetadataValue::List(items) => items.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(text) => Some(text),
            MetadataValue::List(_) => None,
        }
    }
}

/// Insertion-ordered key/value metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    entries: Vec<(String, MetadataValue)>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    /// Non-blank text value for `key`.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(MetadataValue::as_text)
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Replaces an existing value in place, or appends.
    pub fn insert(&mut self, key: impl Into<String>, value: MetadataValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Shallow merge: every non-blank entry of `other` overrides ours.
    pub fn merge(&mut self, other: MetadataRecord) {
        for (key, value) in other.entries {
            if !value.is_blank() {
                self.insert(key, value);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, MetadataValue)> for MetadataRecord {
    fn from_iter<I: IntoIterator<Item = (String, MetadataValue)>>(iter: I) -> Self {
        let mut record = MetadataRecord::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

/// Precedence between a todo's own metadata and what it inherits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// The todo's own definitions override inherited ones.
    #[default]
    InnermostWins,
    /// Inherited definitions override the todo's own, the outermost last.
    OutermostWins,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataOptions {
    pub inherit_from_ancestors: bool,
    pub merge_policy: MergePolicy,
    pub keys: Vec<String>,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            inherit_from_ancestors: true,
            merge_policy: MergePolicy::default(),
            keys: default_keys(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedMetadata {
    pub record: MetadataRecord,
    /// 0-indexed lines of consumed definitions, ascending.
    pub consumed_lines: Vec<usize>,
}

impl ExtractedMetadata {
    pub fn is_consumed(&self, line: usize) -> bool {
        self.consumed_lines.binary_search(&line).is_ok()
    }
}

fn metadata_title(node: &ParsedNode) -> Option<&str> {
    match &node.kind {
        NodeKind::Definition {
            identifier, title, ..
        } if identifier.eq_ignore_ascii_case(METADATA_IDENTIFIER) => {
            Some(title.as_deref().unwrap_or(""))
        }
        _ => None,
    }
}

fn decode_node(node: &ParsedNode, keys: &[String]) -> Result<Option<MetadataRecord>, MetadataError> {
    let (Some(payload), Some(line)) = (metadata_title(node), node.start_line()) else {
        return Ok(None);
    };
    decode_payload(payload, line - 1, keys).map(Some)
}

/// Collects the metadata of the todo whose block is `range`.
pub fn extract_metadata(
    flat: Flattened<'_>,
    range: &TodoRange,
    options: &MetadataOptions,
) -> Result<ExtractedMetadata, MetadataError> {
    let first_line = range.start_line + 1;
    let last_line = range.end_line + 1;

    let in_range: Vec<&ParsedNode> = flat
        .iter()
        .filter(|node| {
            node.start_line()
                .is_some_and(|line| first_line <= line && line <= last_line)
        })
        .collect();

    let header = in_range
        .iter()
        .copied()
        .find(|node| is_todo(node) && node.start_line() == Some(first_line));
    let todo_level = header.map_or(DEFAULT_MIN_TODO_LEVEL, |node| node.level);
    if header.is_none() {
        log::warn!("no todo starts on line {first_line}, assuming level {todo_level}");
    }

    let mut local = MetadataRecord::new();
    let mut consumed_lines = Vec::new();
    for node in in_range {
        if header.is_some_and(|header| header.id == node.id) || node.level > todo_level + 1 {
            continue;
        }
        if let Some(record) = decode_node(node, &options.keys)? {
            local.merge(record);
            if let Some(line) = node.start_line() {
                consumed_lines.push(line - 1);
            }
        }
    }
    consumed_lines.sort_unstable();
    consumed_lines.dedup();

    let mut inherited = Vec::new();
    if options.inherit_from_ancestors
        && let Some(header) = header
    {
        let tree = flat.tree();
        // Outer to inner
        let ancestors: Vec<&ParsedNode> = tree.ancestors(header.id).collect();
        for ancestor in ancestors.into_iter().rev() {
            let mut record = MetadataRecord::new();
            for &child in &ancestor.children {
                if let Some(found) = decode_node(tree.node(child), &options.keys)? {
                    record.merge(found);
                }
            }
            inherited.push(record);
        }
    }

    let record = match options.merge_policy {
        MergePolicy::InnermostWins => {
            let mut record = MetadataRecord::new();
            for ancestor in inherited {
                record.merge(ancestor);
            }
            record.merge(local);
            record
        }
        MergePolicy::OutermostWins => {
            let mut record = local;
            for ancestor in inherited.into_iter().rev() {
                record.merge(ancestor);
            }
            record
        }
    };

    log::debug!(
        "extracted {} metadata entries, consumed lines {consumed_lines:?}",
        record.len()
    );
    Ok(ExtractedMetadata {
        record,
        consumed_lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::ParsedDocument;
    use crate::todo::{DetectionOptions, detect_range};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn extract_at(
        text: &str,
        cursor_line0: usize,
        options: &MetadataOptions,
    ) -> Result<ExtractedMetadata, MetadataError> {
        let doc = ParsedDocument::parse(text).unwrap();
        let range = detect_range(
            doc.flattened(),
            cursor_line0 + 1,
            doc.source(),
            &DetectionOptions::default(),
        )
        .unwrap();
        extract_metadata(doc.flattened(), &range, options)
    }

    fn list(values: &[&str]) -> MetadataValue {
        MetadataValue::List(values.iter().map(|v| v.to_string()).collect())
    }

    fn text(value: &str) -> MetadataValue {
        MetadataValue::Text(value.to_string())
    }

    #[test]
    fn test_definition_in_range_is_extracted_and_consumed() {
        let doc = "- [ ] Write report\n\n  [metadata]: # (Tags: [work])\n  Draft the summary\n";
        let extracted = extract_at(doc, 0, &MetadataOptions::default()).unwrap();
        assert_eq!(extracted.record.get(keys::TAGS), Some(&list(&["work"])));
        assert_eq!(extracted.record.len(), 1);
        assert_eq!(extracted.consumed_lines, vec![2]);
        assert!(extracted.is_consumed(2));
        assert!(!extracted.is_consumed(3));
    }

    #[test]
    fn test_later_definitions_override_earlier() {
        let doc = "- [ ] Todo\n\n  [metadata]: # (Title: First)\n  [metadata]: # (Title: Second)\n";
        let extracted = extract_at(doc, 0, &MetadataOptions::default()).unwrap();
        assert_eq!(extracted.record.text(keys::TITLE), Some("Second"));
        assert_eq!(extracted.consumed_lines, vec![2, 3]);
    }

    #[test]
    fn test_blank_template_values_are_skipped() {
        let doc = "- [ ] Todo\n\n  [metadata]: # (Tags: [])\n  [metadata]: # (Title: )\n  [metadata]: # (FolderPath: notes)\n";
        let extracted = extract_at(doc, 0, &MetadataOptions::default()).unwrap();
        assert_eq!(extracted.record.len(), 1);
        assert_eq!(extracted.record.text(keys::FOLDER_PATH), Some("notes"));
        assert_eq!(extracted.consumed_lines, vec![2, 3, 4]);
    }

    #[test]
    fn test_definition_after_nested_list_belongs_to_todo() {
        let doc = "- [ ] P\n  - child\n\n  [metadata]: # (Title: X)\n  more\n- [ ] Q\n";
        let extracted = extract_at(doc, 0, &MetadataOptions::default()).unwrap();
        assert_eq!(extracted.record.text(keys::TITLE), Some("X"));
        assert_eq!(extracted.consumed_lines, vec![3]);
    }

    #[test]
    fn test_child_todo_metadata_stays_in_body() {
        let doc = "- [ ] Parent\n  - [ ] Child\n\n    [metadata]: # (Title: Child)\n";
        let extracted = extract_at(doc, 0, &MetadataOptions::default()).unwrap();
        assert!(extracted.record.is_empty());
        assert!(extracted.consumed_lines.is_empty());
    }

    #[rstest]
    #[case(MergePolicy::InnermostWins, "Child", "parent-folder")]
    #[case(MergePolicy::OutermostWins, "Parent", "parent-folder")]
    fn test_inheritance_precedence(
        #[case] policy: MergePolicy,
        #[case] title: &str,
        #[case] folder: &str,
    ) {
        let doc = "- [ ] Parent\n\n  [metadata]: # (Title: Parent)\n  [metadata]: # (FolderPath: parent-folder)\n\n  - [ ] Child\n\n    [metadata]: # (Title: Child)\n";
        let options = MetadataOptions {
            merge_policy: policy,
            ..MetadataOptions::default()
        };
        let extracted = extract_at(doc, 5, &options).unwrap();
        assert_eq!(extracted.record.text(keys::TITLE), Some(title));
        assert_eq!(extracted.record.text(keys::FOLDER_PATH), Some(folder));
        // Inherited definitions are never consumed
        assert_eq!(extracted.consumed_lines, vec![7]);
    }

    #[test]
    fn test_inheritance_can_be_disabled() {
        let doc = "- [ ] Parent\n\n  [metadata]: # (FolderPath: parent-folder)\n\n  - [ ] Child\n\n    [metadata]: # (Title: Child)\n";
        let options = MetadataOptions {
            inherit_from_ancestors: false,
            ..MetadataOptions::default()
        };
        let extracted = extract_at(doc, 4, &options).unwrap();
        assert_eq!(extracted.record.get(keys::FOLDER_PATH), None);
        assert_eq!(extracted.record.text(keys::TITLE), Some("Child"));
    }

    #[test]
    fn test_malformed_payload_reports_line() {
        let doc = "- [ ] Todo\n\n  [metadata]: # (Title: [broken)\n";
        let error = extract_at(doc, 0, &MetadataOptions::default()).unwrap_err();
        assert!(matches!(error, MetadataError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_other_definitions_are_ignored() {
        let doc = "- [ ] Todo\n\n  [link]: https://example.com (Title: nope)\n";
        let extracted = extract_at(doc, 0, &MetadataOptions::default()).unwrap();
        assert_eq!(extracted, ExtractedMetadata::default());
    }

    #[test]
    fn test_record_insert_keeps_order() {
        let mut record = MetadataRecord::new();
        record.insert(keys::TITLE, text("a"));
        record.insert(keys::TAGS, list(&["x"]));
        record.insert(keys::TITLE, text("b"));
        let keys: Vec<&str> = record.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["Title", "Tags"]);
        assert_eq!(record.text("Title"), Some("b"));
    }
}
