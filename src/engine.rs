use crate::ast::Root;
use crate::doc::Doc;
use crate::error::ErbfmtResult;
use crate::interface::{
    FormatOptions, Formatting, MarkupFormatter, PassthroughMarkup, PassthroughScript,
    ScriptFormatter,
};
use crate::parser;
use crate::recompose::Recomposer;

/// `Engine` is the primary implementation of the [`Formatting`] trait,
/// tying the tree builder to the delegated markup and script formatters.
///
/// Formatting is one logical thread of control: each delegation is a plain
/// suspension point the engine awaits before resuming, and the first
/// collaborator failure aborts the whole operation with no partial output.
///
/// # Examples
///
/// ```
/// use erbfmt::{Engine, Formatting};
///
/// let engine = Engine::new();
/// let output = engine
///     .format_to_string("<% if a %>\nyes\n<% end %>")
///     .unwrap();
/// assert_eq!(output, "<% if a %>\n  yes\n<% end %>");
/// ```
pub struct Engine<M = PassthroughMarkup, S = PassthroughScript> {
    markup: M,
    script: S,
    options: FormatOptions,
}

impl Engine {
    /// Creates an engine wired to the passthrough reference formatters.
    pub fn new() -> Self {
        Self {
            markup: PassthroughMarkup,
            script: PassthroughScript,
            options: FormatOptions::default(),
        }
    }
}

impl Default for Engine {
    /// Creates a default `Engine` instance by calling `new()`.
    fn default() -> Self {
        Self::new()
    }
}

impl<M: MarkupFormatter, S: ScriptFormatter> Engine<M, S> {
    /// Creates an engine around external collaborator implementations.
    pub fn with_formatters(markup: M, script: S) -> Self {
        Self {
            markup,
            script,
            options: FormatOptions::default(),
        }
    }

    /// Replaces the layout options.
    pub fn with_options(mut self, options: FormatOptions) -> Self {
        self.options = options;
        self
    }

    pub const fn options(&self) -> &FormatOptions {
        &self.options
    }
}

impl<M: MarkupFormatter, S: ScriptFormatter> Formatting for Engine<M, S> {
    fn parse(&self, text: &str) -> ErbfmtResult<Root> {
        Ok(parser::parse(text)?)
    }

    fn format(&self, text: &str) -> ErbfmtResult<Doc> {
        let root = self.parse(text)?;
        Recomposer::new(&root, &self.markup, &self.script, &self.options).render_root()
    }

    fn format_to_string(&self, text: &str) -> ErbfmtResult<String> {
        Ok(self.format(text)?.pretty(self.options.print_width))
    }

    fn render(&self, root: &Root, id: &str) -> ErbfmtResult<Doc> {
        Recomposer::new(root, &self.markup, &self.script, &self.options).render_node(id)
    }
}
