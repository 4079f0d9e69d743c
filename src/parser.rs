//! The tree builder: drives the tokenizer over the root's working text,
//! folds discovered tags into placeholders, and matches block openers to
//! their closers with an explicit stack.
//!
//! The builder alternates between two states: scanning for the next tag,
//! and draining the opener stack when an `end` statement arrives. Invalid
//! stack candidates found while draining are destructively demoted to
//! ordinary nodes; an `end` on an empty stack is fatal.

use crate::ast::{BlockNode, CommentNode, ExpressionNode, Node, NodeId, Root, Span, StatementNode};
use crate::error::{ParseError, ParseErrorKind};
use crate::grammar::{self, Keyword};
use crate::placeholder::PlaceholderAllocator;
use crate::tokenizer::{self, TagKind};

type ParseResult<T> = Result<T, ParseError>;

/// A block opener awaiting its `end`.
///
/// Openers stay raw in the working text until matched, so the recorded
/// offset stays valid: every later edit happens at a higher offset.
struct OpenTag {
    id: NodeId,
    span: Span,
    keyword: Option<Keyword>,
    content: String,
    /// Offset of the raw tag in the working text.
    working_offset: usize,
    /// Length of the raw tag (identical in working and original text).
    raw_length: usize,
}

impl OpenTag {
    /// An opener popped while draining for an `end` is only valid if its
    /// keyword opens a block or its code ends in the `do` pattern.
    fn is_valid_opener(&self) -> bool {
        self.keyword.is_some_and(Keyword::is_opener) || grammar::opens_block(&self.content)
    }
}

struct TreeBuilder<'a> {
    original: &'a str,
    root: Root,
    alloc: PlaceholderAllocator<'a>,
    /// Byte cursor into the working text.
    cursor: usize,
    /// `original_offset - working_offset` for any position at or after the
    /// cursor. Updated on every substitution so discovered tags get exact
    /// original-text spans.
    drift: isize,
    stack: Vec<OpenTag>,
}

/// Parse `text` into a [`Root`]: a placeholder-bearing working text plus
/// the node table.
pub(crate) fn parse(text: &str) -> ParseResult<Root> {
    let mut builder = TreeBuilder {
        original: text,
        root: Root::new(text.to_string()),
        alloc: PlaceholderAllocator::new(text),
        cursor: 0,
        drift: 0,
        stack: Vec::new(),
    };
    builder.run()?;
    Ok(builder.finish())
}

impl TreeBuilder<'_> {
    fn run(&mut self) -> ParseResult<()> {
        loop {
            let Some(tag) = tokenizer::next_tag(self.root.content(), self.cursor) else {
                break;
            };
            let (offset, length, kind) = (tag.offset, tag.length, tag.kind);
            let content = tag.content.to_string();
            let (keyword, trim_start, trim_end) = (tag.keyword, tag.trim_start, tag.trim_end);

            match kind {
                TagKind::Comment => {
                    let id = self.alloc.next();
                    let span = self.source_span(offset, length);
                    self.root.insert(Node::Comment(CommentNode {
                        id: id.clone(),
                        span,
                        content,
                    }));
                    self.substitute(offset, length, &id);
                }
                TagKind::Expression => {
                    let id = self.alloc.next();
                    let span = self.source_span(offset, length);
                    let starts_block = grammar::opens_block(&content);
                    self.root.insert(Node::Expression(ExpressionNode::new(
                        id.clone(),
                        span,
                        content.clone(),
                        starts_block,
                        trim_start,
                        trim_end,
                    )));
                    if starts_block {
                        self.push_opener(id, span, None, content, offset, length);
                    } else {
                        self.substitute(offset, length, &id);
                    }
                }
                TagKind::Statement => {
                    if keyword == Some(Keyword::End) {
                        self.close_block(offset, length, content, trim_start, trim_end)?;
                        continue;
                    }
                    let id = self.alloc.next();
                    let span = self.source_span(offset, length);
                    // Branch separators are members of an existing block,
                    // never openers, even with a trailing `do`.
                    let starts_block = keyword.map_or_else(
                        || grammar::opens_block(&content),
                        Keyword::is_opener,
                    );
                    self.root.insert(Node::Statement(StatementNode::new(
                        id.clone(),
                        span,
                        content.clone(),
                        keyword,
                        starts_block,
                        trim_start,
                        trim_end,
                    )));
                    if starts_block {
                        self.push_opener(id, span, keyword, content, offset, length);
                    } else {
                        self.substitute(offset, length, &id);
                    }
                }
            }
        }
        Ok(())
    }

    /// An `end` statement: drain the stack for a valid opener and fold the
    /// matched pair plus everything between into a block.
    fn close_block(
        &mut self,
        mut offset: usize,
        length: usize,
        content: String,
        trim_start: Option<char>,
        trim_end: Option<char>,
    ) -> ParseResult<()> {
        let start = loop {
            let Some(candidate) = self.stack.pop() else {
                return Err(self.error_at(offset, ParseErrorKind::UnmatchedClosing { code: content }));
            };
            if candidate.is_valid_opener() {
                break candidate;
            }
            // Demoted candidates sit between the eventual opener and this
            // closer, so the rewrite shifts the closer's offset too.
            let delta = candidate.id.len() as isize - candidate.raw_length as isize;
            self.demote(candidate);
            offset = (offset as isize + delta) as usize;
        };

        let end_id = self.alloc.next();
        let end_span = self.source_span(offset, length);
        self.root.insert(Node::Statement(StatementNode::new(
            end_id.clone(),
            end_span,
            content,
            Some(Keyword::End),
            false,
            trim_start,
            trim_end,
        )));

        // Inter-tag text, with placeholders for anything nested already in
        // place from earlier iterations.
        let inner_start = start.working_offset + start.raw_length;
        let inner = self.root.content()[inner_start..offset].to_string();

        debug_assert!(
            start.span.offset + grammar::MIN_TAG_LEN <= end_span.offset,
            "block opener must precede its closer by at least one tag"
        );

        let block_id = self.alloc.next();
        let block_span = Span::new(start.span.offset, end_span.end() - start.span.offset);
        let spans_lines = self.original[block_span.offset..block_span.end()].contains('\n');
        self.root.insert(Node::Block(BlockNode {
            id: block_id.clone(),
            span: block_span,
            start: start.id,
            end: end_id,
            content: inner,
            spans_lines,
        }));

        let working_length = offset + length - start.working_offset;
        self.substitute(start.working_offset, working_length, &block_id);
        Ok(())
    }

    fn push_opener(
        &mut self,
        id: NodeId,
        span: Span,
        keyword: Option<Keyword>,
        content: String,
        working_offset: usize,
        raw_length: usize,
    ) {
        self.stack.push(OpenTag {
            id,
            span,
            keyword,
            content,
            working_offset,
            raw_length,
        });
        self.cursor = working_offset + raw_length;
    }

    /// Fold a stray stack candidate back to an ordinary node: its raw span
    /// in the working text is rewritten to just its placeholder, and the
    /// cursor shifts with the edit.
    fn demote(&mut self, candidate: OpenTag) {
        let delta = candidate.id.len() as isize - candidate.raw_length as isize;
        self.root.content_mut().replace_range(
            candidate.working_offset..candidate.working_offset + candidate.raw_length,
            &candidate.id,
        );
        self.drift -= delta;
        self.cursor = (self.cursor as isize + delta) as usize;
        self.root.demote(&candidate.id);
    }

    /// Replace a working-text span with a placeholder and resume scanning
    /// after it.
    fn substitute(&mut self, offset: usize, length: usize, replacement: &str) {
        self.root
            .content_mut()
            .replace_range(offset..offset + length, replacement);
        self.drift += length as isize - replacement.len() as isize;
        self.cursor = offset + replacement.len();
    }

    /// Openers left unresolved at end of input are folded to their own
    /// placeholders, innermost first so recorded offsets stay exact.
    /// Deliberately not an error: a dangling opener formats as a plain tag.
    fn finish(mut self) -> Root {
        while let Some(open) = self.stack.pop() {
            self.root.content_mut().replace_range(
                open.working_offset..open.working_offset + open.raw_length,
                &open.id,
            );
        }
        self.root
    }

    /// The original-text span of a raw tag discovered at a working-text
    /// offset.
    fn source_span(&self, working_offset: usize, raw_length: usize) -> Span {
        Span::new((working_offset as isize + self.drift) as usize, raw_length)
    }

    fn error_at(&self, working_offset: usize, kind: ParseErrorKind) -> ParseError {
        let offset = ((working_offset as isize + self.drift) as usize).min(self.original.len());
        let prefix = &self.original[..offset];
        let line = prefix.matches('\n').count() + 1;
        let column = offset - prefix.rfind('\n').map_or(0, |pos| pos + 1) + 1;
        ParseError {
            offset,
            line,
            column,
            kind,
        }
    }
}
