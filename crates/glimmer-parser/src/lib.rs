//! Glimmer template parser for glint-check-rs.
//!
//! This crate provides:
//! - A `logos` lexer for the inside of mustaches
//! - A recursive descent parser for the surrounding HTML
//! - AST types where every name the type checker can report on is located
//!
//! # Example
//!
//! ```
//! use glimmer_parser::{parse, Statement};
//!
//! let template = parse("<p>{{@greeting}}, {{this.name}}!</p>").unwrap();
//! assert!(matches!(template.body[0], Statement::Element(_)));
//! ```

mod ast;
mod error;
mod lexer;
mod parser;

pub use ast::*;
pub use error::{ParseError, ParseErrorKind};
pub use lexer::{Lexer, Token, TokenKind};
pub use source_map::Span;

/// Parses template source into an AST.
///
/// Spans in the result are byte offsets into `source`. Parsing stops at the
/// first syntax error.
pub fn parse(source: &str) -> Result<Template, ParseError> {
    parser::Parser::new(source).parse()
}
