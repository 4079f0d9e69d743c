mod ast;
mod doc;
mod engine;
mod error;
mod grammar;
mod interface;
mod parser;
mod placeholder;
mod recompose;
mod tokenizer;

// Public exports.
pub use ast::{BlockNode, CommentNode, ExpressionNode, Node, NodeId, Root, Span, StatementNode};
pub use doc::Doc;
pub use engine::Engine;
pub use error::{ErbfmtError, ErbfmtResult, FormatError, ParseError, ParseErrorKind};
pub use grammar::Keyword;
pub use interface::{
    FormatOptions, Formatting, MarkupFormatter, PassthroughMarkup, PassthroughScript,
    ScriptFormatter,
};
pub use tokenizer::TagKind;
