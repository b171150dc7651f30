//! Markdown parsing into a flattened, position-annotated node tree.
//!
//! The tree is built from pulldown-cmark's offset iterator, then link reference
//! definitions are recovered from the gaps the parser leaves behind, and
//! finally every node gets its nesting level and a place in line order.

pub(crate) mod builder;
pub(crate) mod definitions;
pub mod flatten;
pub mod lines;
pub mod node;

use pulldown_cmark::{Options, Parser};
use thiserror::Error;

use builder::TreeBuilder;
pub use flatten::Flattened;
pub use lines::{LineSource, SourceText};
pub use node::{MarkdownTree, NodeId, NodeKind, ParsedNode, Point, Position, ROOT};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Unbalanced parser events at byte {offset}")]
    UnbalancedEvents { offset: usize },

    #[error("Node starting at byte {offset} was never closed")]
    UnclosedNode { offset: usize },
}

fn parser_options() -> Options {
    Options::ENABLE_TASKLISTS
        | Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_FOOTNOTES
}

/// A parsed document: source text, node arena and line-ordered node ids.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    source: SourceText,
    tree: MarkdownTree,
    order: Vec<NodeId>,
}

impl ParsedDocument {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let source = SourceText::new(text);

        let mut builder = TreeBuilder::new(&source);
        for (event, range) in Parser::new_ext(text, parser_options()).into_offset_iter() {
            builder.process_event(event, range)?;
        }
        let mut nodes = builder.finish()?;
        definitions::attach_definitions(&mut nodes, &source);
        let order = flatten::flatten(&mut nodes);

        log::trace!("parsed {} nodes over {} bytes", nodes.len(), text.len());
        Ok(Self {
            source,
            tree: MarkdownTree::new(nodes),
            order,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        Self::parse(std::str::from_utf8(bytes)?)
    }

    pub fn source(&self) -> &SourceText {
        &self.source
    }

    pub fn tree(&self) -> &MarkdownTree {
        &self.tree
    }

    pub fn flattened(&self) -> Flattened<'_> {
        Flattened::new(&self.tree, &self.order)
    }
}
