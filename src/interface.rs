use crate::ast::Root;
use crate::doc::Doc;
use crate::error::{ErbfmtResult, FormatError};

/// Layout configuration shared with the delegated formatters.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FormatOptions {
    /// Maximum line width the layout aims for.
    pub print_width: usize,
    /// Columns added per block nesting level.
    pub indent_width: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            print_width: 80,
            indent_width: 2,
        }
    }
}

/// The external markup (e.g. HTML) formatting engine.
///
/// Implementations receive placeholder-bearing text and must treat
/// placeholder tokens as unbreakable atomic text: every placeholder
/// substring has to survive verbatim inside the returned document's text
/// leaves, or the recomposer cannot splice the tags back in.
pub trait MarkupFormatter {
    fn format(&self, text: &str, options: &FormatOptions) -> Result<Doc, FormatError>;
}

/// The external scripting-language formatting engine, pure text to text.
pub trait ScriptFormatter {
    fn format(&self, code: &str, options: &FormatOptions) -> Result<String, FormatError>;
}

/// The outward contract of the formatting engine.
pub trait Formatting {
    /// Parse template text into a [`Root`]: placeholder-bearing working
    /// text plus the node table.
    ///
    /// # Errors
    /// - If an `end` statement has no opening statement to close.
    fn parse(&self, text: &str) -> ErbfmtResult<Root>;

    /// Parse and recompose the whole template into a layout document.
    ///
    /// # Errors
    /// - If parsing fails.
    /// - If a delegated formatter fails; no partial output is produced.
    fn format(&self, text: &str) -> ErbfmtResult<Doc>;

    /// [`Formatting::format`], printed through the reference layout
    /// printer at the configured width.
    ///
    /// # Errors
    /// - As [`Formatting::format`].
    fn format_to_string(&self, text: &str) -> ErbfmtResult<String>;

    /// Recompose a single subtree of an existing parse, e.g. for a visitor
    /// framework that only needs one node's rendering.
    ///
    /// # Errors
    /// - If `id` names no node in this parse.
    /// - If a delegated formatter fails.
    fn render(&self, root: &Root, id: &str) -> ErbfmtResult<Doc>;
}

/// Reference markup formatter: reproduces the text with hard line breaks
/// and leaves placeholders untouched. Useful standalone and in tests; a
/// real deployment substitutes an HTML engine here.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughMarkup;

impl MarkupFormatter for PassthroughMarkup {
    fn format(&self, text: &str, _options: &FormatOptions) -> Result<Doc, FormatError> {
        let mut parts = Vec::new();
        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                parts.push(Doc::Hardline);
            }
            if !line.is_empty() {
                parts.push(Doc::text(line));
            }
        }
        Ok(Doc::Concat(parts))
    }
}

/// Reference script formatter: the identity function.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughScript;

impl ScriptFormatter for PassthroughScript {
    fn format(&self, code: &str, _options: &FormatOptions) -> Result<String, FormatError> {
        Ok(code.to_string())
    }
}
