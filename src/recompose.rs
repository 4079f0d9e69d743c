//! The recomposer: walks formatted markup, finds placeholders, and splices
//! recursively formatted sub-documents back in, preserving block structure
//! and line layout.
//!
//! Recomposition never mutates node spans. The only node state it touches
//! is each leaf's write-once formatted-content cell, so rendering the same
//! node twice cannot re-format it.

use crate::ast::{BlockNode, Node, Root};
use crate::doc::Doc;
use crate::error::{ErbfmtError, ErbfmtResult, FormatError};
use crate::grammar::Keyword;
use crate::interface::{FormatOptions, MarkupFormatter, ScriptFormatter};
use crate::placeholder;

const CASE_HEADER: &[&str] = &["case nil"];
const IF_HEADER: &[&str] = &["if true"];
const END_FOOTER: &[&str] = &["end"];
const NOTHING: &[&str] = &[];

/// One piece of a Root's or Block's content after branch splitting.
enum Segment {
    Text(String),
    /// A directly-owned `else`/`elsif`/`when` statement.
    Separator(String),
}

pub(crate) struct Recomposer<'a, M, S> {
    root: &'a Root,
    markup: &'a M,
    script: &'a S,
    options: &'a FormatOptions,
}

impl<'a, M: MarkupFormatter, S: ScriptFormatter> Recomposer<'a, M, S> {
    pub(crate) fn new(
        root: &'a Root,
        markup: &'a M,
        script: &'a S,
        options: &'a FormatOptions,
    ) -> Self {
        Self {
            root,
            markup,
            script,
            options,
        }
    }

    /// Recompose the whole document.
    ///
    /// Root text is never trimmed or re-broken here: the markup formatter
    /// owns the document flow, and a branch separator stranded at the root
    /// (a fold survivor) renders as a plain leaf between its neighbors.
    pub(crate) fn render_root(&self) -> ErbfmtResult<Doc> {
        let mut parts = Vec::new();
        for segment in self.split_branches(self.root.content()) {
            match segment {
                Segment::Text(text) => parts.push(self.render_text_segment(&text)?),
                Segment::Separator(id) => parts.push(self.render_node(&id)?),
            }
        }
        Ok(Doc::Concat(parts))
    }

    /// Recompose a single node's subtree.
    pub(crate) fn render_node(&self, id: &str) -> ErbfmtResult<Doc> {
        let node = self.resolve(id)?;
        match node {
            Node::Block(block) => self.render_block(block),
            Node::Comment(comment) => {
                let (open, close) = tag_pieces(node);
                Ok(render_tag(&open, &comment.content, &close))
            }
            Node::Expression(_) | Node::Statement(_) => {
                let code = self.formatted_code(node)?;
                let (open, close) = tag_pieces(node);
                Ok(render_tag(&open, &code, &close))
            }
        }
    }

    fn resolve(&self, id: &str) -> ErbfmtResult<&Node> {
        self.root
            .resolve_node(id)
            .ok_or_else(|| ErbfmtError::UnknownNode {
                node_id: id.to_string(),
            })
    }

    /// Split content into text segments at directly-owned branch-separator
    /// placeholders. Empty segments are discarded; placeholders for
    /// anything else stay embedded in their text segment.
    fn split_branches(&self, content: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut slice = content;
        while let Some(found) = placeholder::find(slice) {
            let is_separator = self
                .root
                .resolve_node(found.id)
                .is_some_and(|node| node.is_branch_separator());
            if is_separator {
                current.push_str(&slice[..found.start]);
                if !current.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut current)));
                }
                segments.push(Segment::Separator(found.id.to_string()));
            } else {
                current.push_str(&slice[..found.end]);
            }
            slice = &slice[found.end..];
        }
        current.push_str(slice);
        if !current.is_empty() {
            segments.push(Segment::Text(current));
        }
        segments
    }

    /// Render one text segment: a lone known placeholder resolves
    /// directly, anything else goes through the markup formatter and then
    /// placeholder resolution.
    fn render_text_segment(&self, text: &str) -> ErbfmtResult<Doc> {
        if let Some(found) = placeholder::find(text) {
            if found.start == 0
                && found.end == text.len()
                && self.root.resolve_node(found.id).is_some()
            {
                return self.render_node(found.id);
            }
        }
        let doc = self.markup.format(text, self.options)?;
        self.resolve_placeholders(doc)
    }

    /// Walk a formatted document and splice node renderings into its text
    /// leaves wherever known placeholders occur.
    fn resolve_placeholders(&self, doc: Doc) -> ErbfmtResult<Doc> {
        Ok(match doc {
            Doc::Text(text) => self.resolve_text(&text)?,
            Doc::Concat(items) => Doc::Concat(
                items
                    .into_iter()
                    .map(|item| self.resolve_placeholders(item))
                    .collect::<ErbfmtResult<Vec<_>>>()?,
            ),
            Doc::Group(inner) => Doc::Group(Box::new(self.resolve_placeholders(*inner)?)),
            Doc::Indent(width, inner) => {
                Doc::Indent(width, Box::new(self.resolve_placeholders(*inner)?))
            }
            Doc::Dedent(width, inner) => {
                Doc::Dedent(width, Box::new(self.resolve_placeholders(*inner)?))
            }
            Doc::Line | Doc::Softline | Doc::Hardline => doc,
        })
    }

    /// There may be several placeholders per leaf; each known one is
    /// spliced independently, and the scan resumes after the full token so
    /// adjacent placeholders cannot partially re-match. Unknown
    /// placeholder-shaped substrings pass through unchanged.
    fn resolve_text(&self, text: &str) -> ErbfmtResult<Doc> {
        let mut parts = Vec::new();
        let mut slice = text;
        while let Some(found) = placeholder::find(slice) {
            if self.root.resolve_node(found.id).is_some() {
                if found.start > 0 {
                    parts.push(Doc::text(&slice[..found.start]));
                }
                parts.push(self.render_node(found.id)?);
            } else {
                parts.push(Doc::text(&slice[..found.end]));
            }
            slice = &slice[found.end..];
        }
        if !slice.is_empty() {
            parts.push(Doc::text(slice));
        }
        Ok(Doc::Concat(parts))
    }

    /// The script-formatted code for a leaf, computed at most once per
    /// node. Incomplete fragments are made independently valid first and
    /// the synthetic lines stripped back out.
    fn formatted_code(&self, node: &Node) -> ErbfmtResult<String> {
        if let Some(formatted) = node.formatted_content() {
            return Ok(formatted.to_string());
        }
        let formatted = match wrapper_for(node) {
            Some((prefix, suffix)) => {
                reformat_wrapped(self.script, self.options, node.content(), prefix, suffix)?
            }
            None => self.script.format(node.content(), self.options)?,
        };
        node.store_formatted(formatted.clone());
        Ok(formatted)
    }

    /// Content parts for a block, tagged with whether each is a branch
    /// separator. Multi-line blocks own their line structure, so their
    /// text segments are trimmed (and dropped when only whitespace).
    fn block_parts(&self, content: &str, multiline: bool) -> ErbfmtResult<Vec<(bool, Doc)>> {
        let mut parts = Vec::new();
        for segment in self.split_branches(content) {
            match segment {
                Segment::Text(text) => {
                    let text = if multiline {
                        text.trim().to_string()
                    } else {
                        text
                    };
                    if text.is_empty() {
                        continue;
                    }
                    parts.push((false, self.render_text_segment(&text)?));
                }
                Segment::Separator(id) => parts.push((true, self.render_node(&id)?)),
            }
        }
        Ok(parts)
    }

    fn render_block(&self, block: &BlockNode) -> ErbfmtResult<Doc> {
        let start_doc = self.render_node(&block.start)?;
        let end_doc = self.render_node(&block.end)?;
        let parts = self.block_parts(&block.content, block.spans_lines)?;

        if !block.spans_lines {
            let mut all = vec![start_doc];
            all.extend(parts.into_iter().map(|(_, doc)| doc));
            all.push(end_doc);
            return Ok(Doc::Concat(all));
        }

        // A `case` head keeps inline content that precedes its first
        // `when` on the opener's line.
        let case_inline = self.resolve(&block.start)?.keyword() == Some(Keyword::Case)
            && block
                .content
                .chars()
                .next()
                .is_some_and(|c| !c.is_whitespace());

        let indent_width = self.options.indent_width;
        let mut inner = Vec::new();
        for (index, (is_separator, doc)) in parts.into_iter().enumerate() {
            if is_separator {
                // Forced outdent-then-break; the break after comes from
                // the following segment or the closing break.
                inner.push(Doc::dedent(
                    indent_width,
                    Doc::Concat(vec![Doc::Hardline, doc]),
                ));
            } else {
                if index == 0 {
                    if !case_inline {
                        inner.push(Doc::Softline);
                    }
                } else {
                    inner.push(Doc::Hardline);
                }
                inner.push(doc);
            }
        }

        Ok(Doc::Concat(vec![
            start_doc,
            Doc::indent(indent_width, Doc::Concat(inner)),
            Doc::Hardline,
            end_doc,
        ]))
    }
}

/// Opening and closing delimiter strings for a leaf, trim markers
/// included.
fn tag_pieces(node: &Node) -> (String, String) {
    let (open, trim_start, trim_end) = match node {
        Node::Expression(expression) => ("<%=", expression.trim_start, expression.trim_end),
        Node::Statement(statement) => ("<%", statement.trim_start, statement.trim_end),
        Node::Comment(_) | Node::Block(_) => ("<%#", None, None),
    };
    let mut open = open.to_string();
    if let Some(marker) = trim_start {
        open.push(marker);
    }
    let mut close = String::new();
    if let Some(marker) = trim_end {
        close.push(marker);
    }
    close.push_str("%>");
    (open, close)
}

/// Lay out one tag: single line when the content has no newline, otherwise
/// a hard-broken body with a continuation indent matching the opening
/// delimiter's width.
fn render_tag(open: &str, content: &str, close: &str) -> Doc {
    if content.is_empty() {
        return Doc::text(format!("{open} {close}"));
    }
    if !content.contains('\n') {
        return Doc::text(format!("{open} {content} {close}"));
    }
    let continuation = open.chars().count() + 1;
    let mut lines = content.split('\n');
    let first = lines.next().unwrap_or("");
    let mut rest = Vec::new();
    for line in lines {
        rest.push(Doc::Hardline);
        rest.push(Doc::text(line));
    }
    Doc::Concat(vec![
        Doc::text(format!("{open} {first}")),
        Doc::indent(continuation, Doc::Concat(rest)),
        Doc::text(format!(" {close}")),
    ])
}

/// The synthetic boilerplate that makes a fragment independently valid:
/// branch separators get a dummy header, openers a dummy terminator, and a
/// bare `end` a dummy header.
fn wrapper_for(node: &Node) -> Option<(&'static [&'static str], &'static [&'static str])> {
    match node.keyword() {
        Some(Keyword::When) => Some((CASE_HEADER, END_FOOTER)),
        Some(Keyword::Else | Keyword::Elsif) => Some((IF_HEADER, END_FOOTER)),
        Some(Keyword::End) => Some((IF_HEADER, NOTHING)),
        Some(Keyword::If | Keyword::Unless | Keyword::Case) => Some((NOTHING, END_FOOTER)),
        None => {
            if node.starts_block() {
                Some((NOTHING, END_FOOTER))
            } else {
                None
            }
        }
    }
}

/// Wrap, format, unwrap. The synthetic fragments contribute a statically
/// known number of lines, so stripping is exact line-count bookkeeping;
/// the helper knows nothing about keywords.
fn reformat_wrapped<S: ScriptFormatter>(
    script: &S,
    options: &FormatOptions,
    code: &str,
    prefix: &[&str],
    suffix: &[&str],
) -> Result<String, FormatError> {
    let mut wrapped = String::new();
    for line in prefix {
        wrapped.push_str(line);
        wrapped.push('\n');
    }
    wrapped.push_str(code);
    for line in suffix {
        wrapped.push('\n');
        wrapped.push_str(line);
    }
    let formatted = script.format(&wrapped, options)?;
    let lines: Vec<&str> = formatted.split('\n').collect();
    let keep = lines.len().saturating_sub(suffix.len());
    let body = lines.get(prefix.len()..keep).unwrap_or(&[]);
    Ok(body.join("\n"))
}
