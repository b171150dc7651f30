use std::ops::Range;

use pulldown_cmark::{Event, Tag};

use super::ParseError;
use super::lines::SourceText;
use super::node::{NodeId, NodeKind, ParsedNode, Position};

/// Builds the node arena from pulldown-cmark's offset event stream.
///
/// # Event nesting
///
/// pulldown-cmark reports containers as `Start(tag)` / `End(tag)` pairs whose
/// offset range covers the whole element, so a stack of open node ids is enough
/// to recover the tree:
///
/// ```markdown
/// - [ ] Parent
///   - Child
/// ```
///
/// 1. `Start(List)` - opens under the root
/// 2. `Start(Item)` - opens under the list
/// 3. `TaskListMarker(false)` - marks the innermost open item as a todo
/// 4. `Text("Parent")` - leaf under the item
/// 5. `Start(List)`, `Start(Item)`, `Text("Child")`, `End(Item)`, `End(List)` - nested inside the parent item
/// 6. `End(Item)`, `End(List)`
///
/// Task list markers are folded into their item instead of becoming nodes.
pub(crate) struct TreeBuilder<'a> {
    source: &'a SourceText,
    nodes: Vec<ParsedNode>,
    stack: Vec<NodeId>,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(source: &'a SourceText) -> Self {
        let mut builder = Self {
            source,
            nodes: Vec::new(),
            stack: Vec::new(),
        };
        let root = builder.push_node(NodeKind::Root, 0..source.len());
        builder.stack.push(root);
        builder
    }

    pub(crate) fn process_event(
        &mut self,
        event: Event<'_>,
        range: Range<usize>,
    ) -> Result<(), ParseError> {
        match event {
            Event::Start(tag) => {
                let id = self.push_node(kind_for_tag(&tag), range);
                self.stack.push(id);
            }
            Event::End(_) => {
                // The root is never closed by an event
                if self.stack.len() <= 1 {
                    return Err(ParseError::UnbalancedEvents {
                        offset: range.start,
                    });
                }
                self.stack.pop();
            }
            Event::TaskListMarker(checked) => self.mark_task(checked),
            _ => {
                self.push_node(NodeKind::Other, range);
            }
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<Vec<ParsedNode>, ParseError> {
        if let Some(&open) = self.stack.get(1) {
            return Err(ParseError::UnclosedNode {
                offset: self.nodes[open].span.start,
            });
        }
        Ok(self.nodes)
    }

    /// Appends a node as the last child of the innermost open node.
    fn push_node(&mut self, kind: NodeKind, span: Range<usize>) -> NodeId {
        let id = self.nodes.len();
        let mut node = ParsedNode::new(id, kind, span.clone());
        node.position = position_for(self.source, &span);
        if let Some(&parent) = self.stack.last() {
            self.nodes[parent].children.push(id);
        }
        self.nodes.push(node);
        id
    }

    fn mark_task(&mut self, checked: bool) {
        let item = self
            .stack
            .iter()
            .rev()
            .copied()
            .find(|&id| matches!(self.nodes[id].kind, NodeKind::ListItem { .. }));
        match item {
            Some(id) => self.nodes[id].kind = NodeKind::ListItem { checked: Some(checked) },
            None => log::warn!("task list marker outside of a list item"),
        }
    }
}

fn kind_for_tag(tag: &Tag<'_>) -> NodeKind {
    match tag {
        Tag::List(_) => NodeKind::List,
        Tag::Item => NodeKind::ListItem { checked: None },
        Tag::Heading { level, .. } => NodeKind::Heading {
            level: *level as u8,
        },
        Tag::Paragraph => NodeKind::Paragraph,
        Tag::BlockQuote(_) => NodeKind::BlockQuote,
        Tag::Image { dest_url, .. } => NodeKind::Image {
            url: dest_url.to_string(),
        },
        _ => NodeKind::Other,
    }
}

/// Position of `span` with trailing whitespace trimmed, so blocks end on their
/// last content line. Empty and whitespace-only spans have no position.
pub(crate) fn position_for(source: &SourceText, span: &Range<usize>) -> Option<Position> {
    let text = source.as_str().get(span.clone())?;
    let trimmed_len = text.trim_end().len();
    if trimmed_len == 0 {
        return None;
    }
    let end = span.start + trimmed_len;
    let mut end_point = source.point(end - 1);
    end_point.column += 1;
    end_point.offset = end;
    Some(Position {
        start: source.point(span.start),
        end: end_point,
    })
}
