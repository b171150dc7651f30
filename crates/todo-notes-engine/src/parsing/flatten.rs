use super::node::{MarkdownTree, NodeId, ParsedNode, ROOT};

/// Assigns `level` and `parent` to every node and returns the ids in document order.
///
/// Nodes are visited in pre-order (parents before children), then stably sorted
/// by start line so siblings sharing a line keep their parse order. Nodes without
/// a position sort first; line-based consumers skip them.
pub fn flatten(nodes: &mut [ParsedNode]) -> Vec<NodeId> {
    let mut order = Vec::with_capacity(nodes.len());
    if nodes.is_empty() {
        return order;
    }

    nodes[ROOT].level = 0;
    nodes[ROOT].parent = None;
    let mut stack = vec![ROOT];
    while let Some(id) = stack.pop() {
        order.push(id);
        let level = nodes[id].level;
        for index in (0..nodes[id].children.len()).rev() {
            let child = nodes[id].children[index];
            nodes[child].level = level + 1;
            nodes[child].parent = Some(id);
            stack.push(child);
        }
    }

    order.sort_by_key(|&id| nodes[id].start_line().unwrap_or(0));
    order
}

/// A borrowed, line-ordered view over a [`MarkdownTree`].
#[derive(Debug, Clone, Copy)]
pub struct Flattened<'a> {
    tree: &'a MarkdownTree,
    order: &'a [NodeId],
}

impl<'a> Flattened<'a> {
    pub fn new(tree: &'a MarkdownTree, order: &'a [NodeId]) -> Self {
        Self { tree, order }
    }

    pub fn tree(&self) -> &'a MarkdownTree {
        self.tree
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a ParsedNode> + 'a {
        let tree = self.tree;
        self.order.iter().map(move |&id| tree.node(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
