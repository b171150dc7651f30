use std::ops::Range;

/// Index of a node inside a [`MarkdownTree`] arena.
pub type NodeId = usize;

/// The document root always occupies the first arena slot.
pub const ROOT: NodeId = 0;

/// A location in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Point {
    /// 1-indexed line number.
    pub line: usize,
    /// 0-indexed byte column within the line.
    pub column: usize,
    /// 0-indexed byte offset into the whole text.
    pub offset: usize,
}

/// Source span of a node. `end` is exclusive and never covers trailing whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub start: Point,
    pub end: Point,
}

impl Position {
    /// Whether the 1-indexed `line` falls within `[start.line, end.line]`.
    pub fn contains_line(&self, line: usize) -> bool {
        self.start.line <= line && line <= self.end.line
    }
}

/// The node kinds the todo engine inspects. Everything else collapses into `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    List,
    /// `checked` is `None` for plain bullets, `Some` for task list items.
    ListItem {
        checked: Option<bool>,
    },
    Heading {
        level: u8,
    },
    Paragraph,
    BlockQuote,
    Image {
        url: String,
    },
    /// A link reference definition such as `[metadata]: # (Tags: [work])`.
    Definition {
        /// Normalized label (case-folded, inner whitespace collapsed).
        identifier: String,
        url: String,
        title: Option<String>,
    },
    Other,
}

impl NodeKind {
    /// Block containers whose unparsed gaps may hold link reference definitions.
    pub(crate) fn holds_definitions(&self) -> bool {
        matches!(
            self,
            NodeKind::Root | NodeKind::ListItem { .. } | NodeKind::BlockQuote
        )
    }
}

/// A node in the flattened markdown tree.
///
/// `level` and `parent` are filled in by [`flatten`](super::flatten::flatten);
/// `parent` is a plain arena index used for lookups only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub position: Option<Position>,
    pub children: Vec<NodeId>,
    pub level: usize,
    pub parent: Option<NodeId>,
    pub(crate) span: Range<usize>,
}

impl ParsedNode {
    pub(crate) fn new(id: NodeId, kind: NodeKind, span: Range<usize>) -> Self {
        Self {
            id,
            kind,
            position: None,
            children: Vec::new(),
            level: 0,
            parent: None,
            span,
        }
    }

    /// Raw byte range reported by the parser, including trailing whitespace.
    pub fn byte_range(&self) -> Range<usize> {
        self.span.clone()
    }

    /// 1-indexed start line, if the node has a position.
    pub fn start_line(&self) -> Option<usize> {
        self.position.map(|p| p.start.line)
    }

    pub fn contains_line(&self, line: usize) -> bool {
        self.position.is_some_and(|p| p.contains_line(line))
    }
}

/// Arena holding every node of one parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownTree {
    nodes: Vec<ParsedNode>,
}

impl MarkdownTree {
    pub(crate) fn new(nodes: Vec<ParsedNode>) -> Self {
        Self { nodes }
    }

    pub fn root(&self) -> &ParsedNode {
        &self.nodes[ROOT]
    }

    pub fn node(&self, id: NodeId) -> &ParsedNode {
        &self.nodes[id]
    }

    pub fn get(&self, id: NodeId) -> Option<&ParsedNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[ParsedNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Strict ancestors of `id`, innermost first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &ParsedNode> + '_ {
        let mut next = self.get(id).and_then(|node| node.parent);
        std::iter::from_fn(move || {
            let node = self.get(next?)?;
            next = node.parent;
            Some(node)
        })
    }
}
