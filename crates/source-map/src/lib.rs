//! Source position tracking and mapping for glint-rs.
//!
//! This crate provides the position primitives shared by the template parser,
//! the transformer and the diagnostic rewriter: byte [`Span`]s, a
//! [`LineIndex`] for line/column conversion, and [`MappingTree`]s that record
//! how ranges of original template text correspond to ranges of generated
//! TypeScript.

mod line_index;
mod mapping;
mod span;

pub use line_index::{LineCol, LineIndex};
pub use mapping::{Frame, MappingSource, MappingTree, MappingTreeBuilder};
pub use span::{ByteOffset, Span};
