use std::path::{Component, Path, PathBuf};

use relative_path::RelativePathBuf;

use crate::parsing::{NodeKind, ParsedDocument, ParsedNode, ParseError};

/// A replacement of `start..end` in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
}

/// Re-roots relative image targets in `text` as if it moved from `from_dir` to `to_dir`.
///
/// Absolute paths, absolute URLs and empty targets are kept. Everything outside the
/// rewritten targets is byte-identical.
pub fn rewrite_urls(text: &str, from_dir: &Path, to_dir: &Path) -> Result<String, ParseError> {
    let Some(prefix) = url_prefix(from_dir, to_dir) else {
        log::warn!(
            "cannot relate {} to {}, keeping image targets",
            to_dir.display(),
            from_dir.display()
        );
        return Ok(text.to_string());
    };
    if prefix.as_str().is_empty() {
        return Ok(text.to_string());
    }

    let doc = ParsedDocument::parse(text)?;
    let tree = doc.tree();
    let mut edits = Vec::new();
    for node in doc.flattened().iter() {
        let NodeKind::Image { url } = &node.kind else {
            continue;
        };
        if !is_relative_target(url) {
            log::debug!("keeping image target '{url}'");
            continue;
        }

        // The target follows the alt text
        let search_from = node
            .children
            .iter()
            .map(|&child| tree.node(child).byte_range().end)
            .fold(node.byte_range().start, usize::max);
        match locate(text, node, search_from, url) {
            Some(start) => edits.push(Edit {
                start,
                end: start + url.len(),
                text: prefix.join_normalized(url).into_string(),
            }),
            None => log::debug!("image target '{url}' not found verbatim, leaving it"),
        }
    }

    edits.sort_by_key(|edit| edit.start);
    Ok(apply_edits(text, &edits))
}

fn is_relative_target(url: &str) -> bool {
    !url.is_empty()
        && !url.starts_with('/')
        && !Path::new(url).is_absolute()
        && url::Url::parse(url).is_err()
}

fn locate(text: &str, node: &ParsedNode, search_from: usize, url: &str) -> Option<usize> {
    let end = node.byte_range().end.min(text.len());
    text.get(search_from..end)?
        .find(url)
        .map(|found| search_from + found)
}

/// Splices edits left to right. Edits must be sorted and disjoint.
fn apply_edits(text: &str, edits: &[Edit]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for edit in edits {
        debug_assert!(edit.start >= cursor, "overlapping edits at {}", edit.start);
        out.push_str(&text[cursor..edit.start]);
        out.push_str(&edit.text);
        cursor = edit.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Splits `path` into its root (drive prefix and root directory) and a normalized remainder.
fn split_root(path: &Path) -> Option<(PathBuf, RelativePathBuf)> {
    let root: PathBuf = path
        .components()
        .take_while(|component| matches!(component, Component::Prefix(_) | Component::RootDir))
        .collect();
    let rest = path.strip_prefix(&root).ok()?;
    let rest = RelativePathBuf::from_path(rest).ok()?;
    Some((root, rest.normalize()))
}

/// Directory prefix leading from `to_dir` back to `from_dir`.
///
/// `None` when the two do not share a root or are not valid UTF-8.
pub fn url_prefix(from_dir: &Path, to_dir: &Path) -> Option<RelativePathBuf> {
    let (from_root, from) = split_root(from_dir)?;
    let (to_root, to) = split_root(to_dir)?;
    (from_root == to_root).then(|| to.relative(&from))
}
