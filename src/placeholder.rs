//! Placeholder tokens: allocation during parsing, detection during
//! recomposition.
//!
//! A placeholder has the shape `#~<n>~#`. The markers were picked to be
//! lexically unlikely in markup or script source, and the allocator skips
//! any value that does occur verbatim in the input, so a generated token is
//! never a substring of the original text.

const MARKER_START: &str = "#~";
const MARKER_END: &str = "~#";

/// Hands out sequential collision-free placeholder tokens for one parse.
///
/// Uniqueness is only guaranteed for the lifetime of the borrowed input;
/// two parses may hand out identical tokens.
pub(crate) struct PlaceholderAllocator<'a> {
    original: &'a str,
    next_id: u64,
}

impl<'a> PlaceholderAllocator<'a> {
    pub(crate) fn new(original: &'a str) -> Self {
        Self {
            original,
            next_id: 0,
        }
    }

    pub(crate) fn next(&mut self) -> String {
        loop {
            self.next_id += 1;
            let token = format!("{}{}{}", MARKER_START, self.next_id, MARKER_END);
            if !self.original.contains(&token) {
                return token;
            }
        }
    }
}

/// A placeholder-shaped token found in a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PlaceholderMatch<'a> {
    /// Byte offset of the first marker character.
    pub(crate) start: usize,
    /// Byte offset one past the last marker character.
    pub(crate) end: usize,
    /// The full token, markers included; this is the node id it names.
    pub(crate) id: &'a str,
}

/// Find the first well-formed placeholder token in `text`.
///
/// Resolution must resume at `end`, never inside the matched token, so
/// adjacent placeholders with no intervening text are each found exactly
/// once. Marker-like sequences with no digits between them are not
/// placeholders and are skipped over.
pub(crate) fn find(text: &str) -> Option<PlaceholderMatch<'_>> {
    let mut search = 0;
    while let Some(found) = text[search..].find(MARKER_START) {
        let start = search + found;
        let digits_start = start + MARKER_START.len();
        let digits_len = text[digits_start..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        if digits_len > 0 && text[digits_start + digits_len..].starts_with(MARKER_END) {
            let end = digits_start + digits_len + MARKER_END.len();
            return Some(PlaceholderMatch {
                start,
                end,
                id: &text[start..end],
            });
        }
        search = start + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ntest::timeout(100)]
    fn test_sequential_allocation() {
        let mut alloc = PlaceholderAllocator::new("plain text");
        assert_eq!(alloc.next(), "#~1~#");
        assert_eq!(alloc.next(), "#~2~#");
        assert_eq!(alloc.next(), "#~3~#");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_collisions_are_skipped() {
        let mut alloc = PlaceholderAllocator::new("text with a literal #~1~# and #~2~# inside");
        assert_eq!(alloc.next(), "#~3~#");
        assert_eq!(alloc.next(), "#~4~#");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_find_in_markup() {
        let m = find("<div>#~1~#</div>").expect("placeholder should be found");
        assert_eq!(m.start, 5);
        assert_eq!(m.end, 10);
        assert_eq!(m.id, "#~1~#");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_adjacent_placeholders_step_exactly() {
        let text = "#~1~##~2~#";
        let first = find(text).expect("first placeholder");
        assert_eq!((first.start, first.end), (0, 5));
        assert_eq!(first.id, "#~1~#");

        let second = find(&text[first.end..]).expect("second placeholder");
        assert_eq!(second.id, "#~2~#");
        assert_eq!((second.start, second.end), (0, 5));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_malformed_tokens_are_not_matched() {
        assert_eq!(find("#~~#"), None);
        assert_eq!(find("#~x~#"), None);
        // A malformed prefix does not mask a following well-formed token.
        let m = find("#~#~7~#").expect("inner token should be found");
        assert_eq!(m.id, "#~7~#");
        assert_eq!((m.start, m.end), (2, 7));
    }
}
