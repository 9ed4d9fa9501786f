//! Parse error types.

use source_map::Span;
use thiserror::Error;

/// An error that stopped template parsing.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// Where in the template the error was detected.
    pub span: Span,
}

impl ParseError {
    /// Creates a new parse error.
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Shorthand for a [`ParseErrorKind::SyntaxError`].
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::new(
            ParseErrorKind::SyntaxError {
                message: message.into(),
            },
            span,
        )
    }
}

/// The kind of parse error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    /// An unexpected token was encountered inside a mustache.
    #[error("Expected {expected}, found {found}")]
    UnexpectedToken {
        /// What was expected.
        expected: String,
        /// What was found.
        found: String,
    },

    /// The template ended too early.
    #[error("Unexpected end of template, expected {expected}")]
    UnexpectedEof {
        /// What was expected.
        expected: String,
    },

    /// An element was never closed.
    #[error("Unclosed element `{tag}`")]
    UnclosedElement {
        /// The tag name of the unclosed element.
        tag: String,
    },

    /// A closing tag did not match the open element.
    #[error("Closing tag </{found}> did not match last open tag <{expected}>")]
    MismatchedClosingTag {
        /// The tag that was open.
        expected: String,
        /// The closing tag that was found.
        found: String,
    },

    /// A closing tag appeared with no open element.
    #[error("Closing tag </{tag}> without an open tag")]
    UnexpectedClosingTag {
        /// The closing tag name.
        tag: String,
    },

    /// A block was never closed.
    #[error("Unclosed block {{{{#{name}}}}}")]
    UnclosedBlock {
        /// The block's path.
        name: String,
    },

    /// A block was closed with the wrong name.
    #[error("{expected} doesn't match {found}")]
    MismatchedBlockClose {
        /// The block's path.
        expected: String,
        /// The name in the closing mustache.
        found: String,
    },

    /// A comment was never terminated.
    #[error("Unclosed comment")]
    UnclosedComment,

    /// A malformed attribute.
    #[error("Invalid attribute: {message}")]
    InvalidAttribute {
        /// A description of the problem.
        message: String,
    },

    /// A malformed path expression.
    #[error("Invalid path: {message}")]
    InvalidPath {
        /// A description of the problem.
        message: String,
    },

    /// A generic syntax error.
    #[error("{message}")]
    SyntaxError {
        /// A description of the error.
        message: String,
    },
}
