//! Mapping trees: hierarchical original ↔ transformed range correspondences.
//!
//! A [`MappingTree`] mirrors the nesting of the construct that produced it.
//! Each node pairs a range in the original text with the range of output it
//! was compiled to. Trees are built with a [`MappingTreeBuilder`], which
//! appends output text and tracks a stack of open frames; closing a frame
//! records a completed node in its parent.

use crate::{ByteOffset, Span};
use smol_str::SmolStr;
use std::fmt::{self, Write as _};
use text_size::TextSize;

/// What produced a mapping node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MappingSource {
    /// The whole embedding, delimiters included.
    TemplateEmbedding,
    /// The template contents, delimiters excluded.
    Template,
    /// Freeform text; recorded as a zero-width marker.
    TextContent,
    /// A single identifier or key in the output.
    Identifier(SmolStr),
    /// Any other syntax node, named by its AST kind.
    Node(&'static str),
}

impl MappingSource {
    /// Returns true for identifier nodes.
    pub fn is_identifier(&self) -> bool {
        matches!(self, MappingSource::Identifier(_))
    }
}

impl fmt::Display for MappingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingSource::TemplateEmbedding => f.write_str("TemplateEmbedding"),
            MappingSource::Template => f.write_str("Template"),
            MappingSource::TextContent => f.write_str("TextContent"),
            MappingSource::Identifier(name) => write!(f, "Identifier({name})"),
            MappingSource::Node(kind) => f.write_str(kind),
        }
    }
}

/// A node in a mapping tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTree {
    /// The construct this node was produced from.
    pub source: MappingSource,
    /// Range in the original text.
    pub original: Span,
    /// Range in the generated text.
    pub transformed: Span,
    /// Nested mappings, in emission order.
    pub children: Vec<MappingTree>,
}

impl MappingTree {
    /// Creates a node.
    pub fn new(
        source: MappingSource,
        original: Span,
        transformed: Span,
        children: Vec<MappingTree>,
    ) -> Self {
        Self {
            source,
            original,
            transformed,
            children,
        }
    }

    /// Finds the deepest node whose transformed range contains `range`.
    ///
    /// Siblings are ordered and non-overlapping in transformed space, so the
    /// first candidate child is found by binary search. When a point sits on
    /// the boundary of two siblings the earlier one wins.
    pub fn narrowest_for_transformed(&self, range: Span) -> Option<&MappingTree> {
        if !self.transformed.contains_span(range) {
            return None;
        }

        let first = self
            .children
            .partition_point(|child| child.transformed.end < range.start);
        for child in &self.children[first..] {
            if child.transformed.start > range.start {
                break;
            }
            if let Some(found) = child.narrowest_for_transformed(range) {
                return Some(found);
            }
        }

        Some(self)
    }

    /// Finds the deepest node whose original range contains `range`.
    ///
    /// Emission order is not always source order (component arguments are
    /// emitted before plain attributes), so children are scanned in order.
    pub fn narrowest_for_original(&self, range: Span) -> Option<&MappingTree> {
        if !self.original.contains_span(range) {
            return None;
        }

        self.children
            .iter()
            .find_map(|child| child.narrowest_for_original(range))
            .or(Some(self))
    }

    /// Translates an original offset inside this node to a transformed one.
    ///
    /// Nodes whose two ranges have the same length (identifiers, literals
    /// copied through) translate linearly; others collapse to their start,
    /// or their end when the offset is the node's end.
    pub fn transformed_offset_for(&self, original: ByteOffset) -> ByteOffset {
        if self.original.len() == self.transformed.len() {
            return self.transformed.start + (original - self.original.start);
        }
        if original == self.original.end && !self.original.is_empty() {
            self.transformed.end
        } else {
            self.transformed.start
        }
    }

    /// Inverse of [`MappingTree::transformed_offset_for`].
    pub fn original_offset_for(&self, transformed: ByteOffset) -> ByteOffset {
        if self.original.len() == self.transformed.len() {
            return self.original.start + (transformed - self.transformed.start);
        }
        if transformed == self.transformed.end && !self.transformed.is_empty() {
            self.original.end
        } else {
            self.original.start
        }
    }

    /// Visits every node depth-first, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a MappingTree, Option<&'a MappingTree>)) {
        self.walk_inner(None, visit);
    }

    fn walk_inner<'a>(
        &'a self,
        parent: Option<&'a MappingTree>,
        visit: &mut impl FnMut(&'a MappingTree, Option<&'a MappingTree>),
    ) {
        visit(self, parent);
        for child in &self.children {
            child.walk_inner(Some(self), visit);
        }
    }

    /// Renders the tree with the text each range covers.
    ///
    /// `original_text` and `transformed_text` must be in the same coordinate
    /// space as the tree's ranges.
    pub fn to_debug_string(&self, original_text: &str, transformed_text: &str) -> String {
        let mut out = String::new();
        self.write_debug(&mut out, 1, original_text, transformed_text);
        out
    }

    fn write_debug(&self, out: &mut String, depth: usize, original: &str, transformed: &str) {
        let prefix = "| ".repeat(depth);
        let hbs = self.original.slice(original).unwrap_or("<out of range>");
        let ts = self.transformed.slice(transformed).unwrap_or("<out of range>");

        let _ = writeln!(out, "{prefix}Mapping: {}", self.source);
        let _ = writeln!(out, "{prefix} hbs({}): {}", self.original, hbs.escape_debug());
        let _ = writeln!(out, "{prefix} ts({}):  {}", self.transformed, ts.escape_debug());
        let _ = writeln!(out, "{}", prefix.trim_end());

        for child in &self.children {
            child.write_debug(out, depth + 1, original, transformed);
        }
    }
}

/// An open frame, returned by [`MappingTreeBuilder::open`].
#[derive(Debug)]
#[must_use = "an open frame must be closed"]
pub struct Frame {
    depth: usize,
    start: ByteOffset,
}

/// Accumulates generated text and the mapping tree describing it.
#[derive(Debug)]
pub struct MappingTreeBuilder {
    output: String,
    frames: Vec<Vec<MappingTree>>,
}

impl Default for MappingTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingTreeBuilder {
    /// Creates an empty builder with only the root frame open.
    pub fn new() -> Self {
        Self {
            output: String::new(),
            frames: vec![Vec::new()],
        }
    }

    /// Current length of the generated output.
    #[inline]
    pub fn offset(&self) -> ByteOffset {
        TextSize::from(self.output.len() as u32)
    }

    /// The output generated so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Appends unmapped text to the output.
    pub fn push_str(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// Opens a frame starting at the current output offset.
    pub fn open(&mut self) -> Frame {
        self.frames.push(Vec::new());
        Frame {
            depth: self.frames.len(),
            start: self.offset(),
        }
    }

    /// Closes `frame`, recording a node for everything emitted since it was
    /// opened. Frames that emitted nothing are dropped unless `allow_empty`.
    ///
    /// # Panics
    ///
    /// Panics if frames are closed out of order.
    pub fn close(&mut self, frame: Frame, source: MappingSource, original: Span, allow_empty: bool) {
        assert_eq!(
            frame.depth,
            self.frames.len(),
            "mapping frames must be closed in reverse order of opening"
        );
        let children = self.frames.pop().unwrap_or_default();
        let transformed = Span::new(frame.start, self.offset());

        if allow_empty || !transformed.is_empty() {
            let parent = self
                .frames
                .last_mut()
                .expect("the root frame is never closed");
            parent.push(MappingTree::new(source, original, transformed, children));
        }
    }

    /// Finishes the build, wrapping all top-level nodes in a root node that
    /// spans the whole output.
    ///
    /// # Panics
    ///
    /// Panics if any frame is still open.
    pub fn finish(mut self, source: MappingSource, original: Span) -> (String, MappingTree) {
        assert_eq!(self.frames.len(), 1, "unclosed mapping frames at finish");
        let children = self.frames.pop().unwrap_or_default();
        let transformed = Span::new(TextSize::from(0), self.offset());
        (
            self.output,
            MappingTree::new(source, original, transformed, children),
        )
    }
}
