//! The flat node table produced by a parse.
//!
//! Nodes never own each other: every inter-node relationship is an id
//! reference into the arena owned by [`Root`], because a child's position
//! in its parent's text is only stable as a placeholder, not as a
//! structural pointer. The table is append-only while parsing and immutable
//! afterwards, except for each leaf's write-once formatted-content cell.

use std::cell::OnceCell;
use std::collections::HashMap;

use crate::grammar::Keyword;

/// A node id is the placeholder token that stands in for the node inside
/// working text (`#~<n>~#`).
pub type NodeId = String;

/// A byte range into the *original*, un-rewritten source text.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    pub offset: usize,
    pub length: usize,
}

impl Span {
    pub const fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    pub const fn end(&self) -> usize {
        self.offset + self.length
    }

    pub const fn contains(&self, offset: usize) -> bool {
        self.offset <= offset && offset < self.end()
    }
}

/// An `<%= ... %>` tag.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionNode {
    pub id: NodeId,
    pub span: Span,
    /// The embedded code, whitespace-trimmed.
    pub content: String,
    /// True when the code ends in `do`/`do |params|` and the expression
    /// opens a block exactly like an `if` statement would.
    pub starts_block: bool,
    pub trim_start: Option<char>,
    pub trim_end: Option<char>,
    #[cfg_attr(feature = "serde", serde(skip))]
    formatted: OnceCell<String>,
}

/// A `<% ... %>` tag.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementNode {
    pub id: NodeId,
    pub span: Span,
    pub content: String,
    /// Reserved keyword at the head of the code, if any.
    pub keyword: Option<Keyword>,
    pub starts_block: bool,
    pub trim_start: Option<char>,
    pub trim_end: Option<char>,
    #[cfg_attr(feature = "serde", serde(skip))]
    formatted: OnceCell<String>,
}

/// A `<%# ... %>` tag. Comments never participate in block matching.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentNode {
    pub id: NodeId,
    pub span: Span,
    pub content: String,
}

/// A matched opener/closer pair plus everything between.
///
/// `start` and `end` are ids of nodes registered independently in the
/// arena; `content` is the inter-tag text, still carrying placeholders for
/// any nested tags.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockNode {
    pub id: NodeId,
    pub span: Span,
    pub start: NodeId,
    pub end: NodeId,
    pub content: String,
    /// Whether the block's original span contains a newline. Computed from
    /// the original text, so newlines hidden behind nested placeholders
    /// still count.
    pub spans_lines: bool,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Expression(ExpressionNode),
    Statement(StatementNode),
    Comment(CommentNode),
    Block(BlockNode),
}

impl ExpressionNode {
    pub(crate) fn new(
        id: NodeId,
        span: Span,
        content: String,
        starts_block: bool,
        trim_start: Option<char>,
        trim_end: Option<char>,
    ) -> Self {
        Self {
            id,
            span,
            content,
            starts_block,
            trim_start,
            trim_end,
            formatted: OnceCell::new(),
        }
    }
}

impl StatementNode {
    pub(crate) fn new(
        id: NodeId,
        span: Span,
        content: String,
        keyword: Option<Keyword>,
        starts_block: bool,
        trim_start: Option<char>,
        trim_end: Option<char>,
    ) -> Self {
        Self {
            id,
            span,
            content,
            keyword,
            starts_block,
            trim_start,
            trim_end,
            formatted: OnceCell::new(),
        }
    }
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Self::Expression(node) => &node.id,
            Self::Statement(node) => &node.id,
            Self::Comment(node) => &node.id,
            Self::Block(node) => &node.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Expression(node) => node.span,
            Self::Statement(node) => node.span,
            Self::Comment(node) => node.span,
            Self::Block(node) => node.span,
        }
    }

    /// The semantically relevant inner text: code for expressions and
    /// statements, text for comments, inter-tag text for blocks.
    pub fn content(&self) -> &str {
        match self {
            Self::Expression(node) => &node.content,
            Self::Statement(node) => &node.content,
            Self::Comment(node) => &node.content,
            Self::Block(node) => &node.content,
        }
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self {
            Self::Statement(node) => node.keyword,
            Self::Expression(_) | Self::Comment(_) | Self::Block(_) => None,
        }
    }

    pub fn starts_block(&self) -> bool {
        match self {
            Self::Expression(node) => node.starts_block,
            Self::Statement(node) => node.starts_block,
            Self::Comment(_) | Self::Block(_) => false,
        }
    }

    pub(crate) fn is_branch_separator(&self) -> bool {
        self.keyword().is_some_and(Keyword::is_branch)
    }

    /// The script-formatted content, once the recomposer has attached it.
    pub fn formatted_content(&self) -> Option<&str> {
        match self {
            Self::Expression(node) => node.formatted.get().map(String::as_str),
            Self::Statement(node) => node.formatted.get().map(String::as_str),
            Self::Comment(_) | Self::Block(_) => None,
        }
    }

    /// Attach the script-formatted content. The first write wins; later
    /// writes are ignored so a node is never re-formatted.
    pub(crate) fn store_formatted(&self, formatted: String) {
        let cell = match self {
            Self::Expression(node) => &node.formatted,
            Self::Statement(node) => &node.formatted,
            Self::Comment(_) | Self::Block(_) => return,
        };
        let _ = cell.set(formatted);
    }
}

/// The result of parsing one template: the original text, the working text
/// with every tag folded into a placeholder, and the node table.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    original: String,
    content: String,
    nodes: HashMap<NodeId, Node>,
}

impl Root {
    pub(crate) fn new(original: String) -> Self {
        let content = original.clone();
        Self {
            original,
            content,
            nodes: HashMap::new(),
        }
    }

    /// The original source text, untouched.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// The working text: the original with every discovered tag replaced by
    /// its placeholder. After parsing this is the text handed to the
    /// markup formatter.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub(crate) fn content_mut(&mut self) -> &mut String {
        &mut self.content
    }

    pub fn resolve_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// The most specific node whose original span contains `offset`, for
    /// source-map style lookups. Blocks enclose their members, so the
    /// narrowest span wins.
    pub fn node_at(&self, offset: usize) -> Option<&Node> {
        self.nodes
            .values()
            .filter(|node| node.span().contains(offset))
            .min_by_key(|node| node.span().length)
    }

    pub(crate) fn insert(&mut self, node: Node) {
        self.nodes.insert(node.id().to_string(), node);
    }

    /// Fold a node back to an ordinary, non-block node after a failed
    /// stack match.
    pub(crate) fn demote(&mut self, id: &str) {
        match self.nodes.get_mut(id) {
            Some(Node::Expression(node)) => node.starts_block = false,
            Some(Node::Statement(node)) => node.starts_block = false,
            Some(Node::Comment(_) | Node::Block(_)) | None => {}
        }
    }
}
