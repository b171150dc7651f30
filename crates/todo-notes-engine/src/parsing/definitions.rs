//! Recovery of link reference definitions.
//!
//! pulldown-cmark resolves `[label]: destination "title"` definitions while
//! parsing and emits no events for them, so they leave holes in the byte
//! ranges of their enclosing container. Each hole that starts a line and
//! matches the single-line definition grammar becomes a `Definition` node under
//! that container.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use super::builder::position_for;
use super::lines::SourceText;
use super::node::{NodeId, NodeKind, ParsedNode};

fn definition_regex() -> &'static Regex {
    static DEFINITION_REGEX: OnceLock<Regex> = OnceLock::new();
    DEFINITION_REGEX.get_or_init(|| {
        Regex::new(
            r#"^[ \t>]*\[(?P<label>(?:[^\[\]\\]|\\.)+)\]:[ \t]*(?P<url><[^<>\n]*>|[^ \t<][^ \t]*)(?:[ \t]+(?P<title>"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|\((?:[^()\\]|\\.)*\)))?[ \t]*$"#,
        )
        .expect("Invalid definition regex")
    })
}

/// Adds `Definition` nodes for every definition line found in container gaps.
///
/// A nested list's span can run on past its last item over lines of the
/// enclosing item, so list gaps are scanned as well. Definitions found there
/// belong to the list's parent.
pub(crate) fn attach_definitions(nodes: &mut Vec<ParsedNode>, source: &SourceText) {
    let mut parents: Vec<Option<NodeId>> = vec![None; nodes.len()];
    for node in nodes.iter() {
        for &child in &node.children {
            parents[child] = Some(node.id);
        }
    }

    // (scanned node, node the definitions attach to)
    let containers: Vec<(NodeId, NodeId)> = nodes
        .iter()
        .filter_map(|node| match &node.kind {
            NodeKind::List => parents[node.id].map(|parent| (node.id, parent)),
            kind if kind.holds_definitions() => Some((node.id, node.id)),
            _ => None,
        })
        .collect();

    for (scanned, owner) in containers {
        let found: Vec<(NodeKind, Range<usize>)> = gaps(nodes, scanned)
            .into_iter()
            .flat_map(|gap| scan_gap(source, gap))
            .collect();

        for (kind, span) in found {
            let id = nodes.len();
            let mut node = ParsedNode::new(id, kind, span.clone());
            node.position = position_for(source, &span);
            nodes.push(node);

            let index = nodes[owner]
                .children
                .partition_point(|&child| nodes[child].span.start < span.start);
            nodes[owner].children.insert(index, id);
        }
    }
}

/// Byte ranges of `container` not covered by any child.
fn gaps(nodes: &[ParsedNode], container: NodeId) -> Vec<Range<usize>> {
    let node = &nodes[container];
    let mut gaps = Vec::new();
    let mut cursor = node.span.start;
    for &child in &node.children {
        let span = &nodes[child].span;
        if span.start > cursor {
            gaps.push(cursor..span.start);
        }
        cursor = cursor.max(span.end);
    }
    if cursor < node.span.end {
        gaps.push(cursor..node.span.end);
    }
    gaps
}

fn scan_gap(source: &SourceText, gap: Range<usize>) -> Vec<(NodeKind, Range<usize>)> {
    let mut found = Vec::new();
    let mut offset = gap.start;
    for piece in source.as_str()[gap].split_inclusive('\n') {
        let line = piece.trim_end_matches(['\n', '\r']);
        if source.is_line_start(offset)
            && let Some(kind) = parse_definition(line)
        {
            let indent = line.len() - line.trim_start_matches([' ', '\t', '>']).len();
            found.push((kind, offset + indent..offset + line.len()));
        }
        offset += piece.len();
    }
    found
}

/// Parses one definition line into a `Definition` node kind.
pub(crate) fn parse_definition(line: &str) -> Option<NodeKind> {
    let captures = definition_regex().captures(line)?;
    let label = captures.name("label")?.as_str();
    let url = captures.name("url")?.as_str();
    let url = url
        .strip_prefix('<')
        .and_then(|inner| inner.strip_suffix('>'))
        .unwrap_or(url);
    let title = captures
        .name("title")
        .map(|title| unescape(&title.as_str()[1..title.as_str().len() - 1]));

    Some(NodeKind::Definition {
        identifier: normalize_label(label),
        url: unescape(url),
        title,
    })
}

/// Label matching is case-insensitive with collapsed whitespace.
fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && next.is_ascii_punctuation()
        {
            out.push(next);
            chars.next();
            continue;
        }
        out.push(c);
    }
    out
}
