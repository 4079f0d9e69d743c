pub type ErbfmtResult<T> = std::result::Result<T, ErbfmtError>;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// An `end` statement was found with no open block to terminate.
    UnmatchedClosing {
        /// The literal code of the offending statement, e.g. `"end"`.
        code: String,
    },
    Message(String),
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnmatchedClosing { code } => {
                write!(f, "No opening statement for closing statement '{}'", code)
            }
            Self::Message(msg) => {
                write!(f, "Parser error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ParseErrorKind {}

/// A fatal parse failure, positioned in the original source text.
///
/// `offset` is the byte offset of the tag that triggered the failure;
/// `line` and `column` are the 1-indexed human-readable equivalents derived
/// from the same offset.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParseError {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    pub kind: ParseErrorKind,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Parse error at offset {} (line {}, column {}): {}",
            self.offset, self.line, self.column, self.kind
        )
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// A failure reported by one of the delegated formatters.
///
/// The recomposer never produces partial output: the first collaborator
/// failure aborts the whole operation and is propagated unchanged.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormatError {
    pub message: String,
}

impl FormatError {
    pub fn new<T: Into<String>>(message: T) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Formatting error: {}", self.message)
    }
}

impl std::error::Error for FormatError {}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErbfmtError {
    Parse(ParseError),
    Format(FormatError),
    UnknownNode {
        node_id: String,
    },
}

impl std::fmt::Display for ErbfmtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(parse_error) => {
                write!(f, "{}", parse_error)
            }
            Self::Format(format_error) => {
                write!(f, "{}", format_error)
            }
            Self::UnknownNode { node_id } => {
                write!(f, "Node not found: {}", node_id)
            }
        }
    }
}

impl std::error::Error for ErbfmtError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(parse_error) => Some(parse_error),
            Self::Format(format_error) => Some(format_error),
            Self::UnknownNode { .. } => None,
        }
    }
}

impl From<ParseError> for ErbfmtError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<FormatError> for ErbfmtError {
    fn from(error: FormatError) -> Self {
        Self::Format(error)
    }
}
