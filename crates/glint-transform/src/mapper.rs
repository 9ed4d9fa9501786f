//! Output text, mapping frames, errors and directives for one template.
//!
//! The [`Mapper`] knows nothing about the template AST. AST spans are
//! relative to the template contents; the mapper moves them into embedding
//! coordinates (contents start after the embedding's opening delimiter) when
//! it records them.

use camino::Utf8Path;
use source_map::{Frame, MappingSource, MappingTree, MappingTreeBuilder, Span};
use text_size::TextSize;

use crate::directives::{Directive, DirectiveKind};
use crate::error::{TransformError, TransformErrorKind};

const INDENT: &str = "  ";

pub(crate) struct Mapper<'a> {
    builder: MappingTreeBuilder,
    file: &'a Utf8Path,
    /// Where the template contents start within the embedding.
    content_offset: TextSize,
    indent_level: usize,
    errors: Vec<TransformError>,
    directives: Vec<Directive>,
}

impl<'a> Mapper<'a> {
    pub(crate) fn new(file: &'a Utf8Path, content_offset: TextSize) -> Self {
        Self {
            builder: MappingTreeBuilder::new(),
            file,
            content_offset,
            indent_level: 0,
            errors: Vec::new(),
            directives: Vec::new(),
        }
    }

    /// Moves a template-relative span into embedding coordinates.
    pub(crate) fn original(&self, span: Span) -> Span {
        span.shift(self.content_offset)
    }

    pub(crate) fn text(&mut self, text: &str) {
        self.builder.push_str(text);
    }

    /// Starts a new line at the current indentation.
    pub(crate) fn newline(&mut self) {
        self.builder.push_str("\n");
        for _ in 0..self.indent_level {
            self.builder.push_str(INDENT);
        }
    }

    pub(crate) fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub(crate) fn dedent(&mut self) {
        debug_assert!(self.indent_level > 0, "dedent below zero");
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    pub(crate) fn open(&mut self) -> Frame {
        self.builder.open()
    }

    /// Closes a frame for a template-relative span.
    pub(crate) fn close(&mut self, frame: Frame, source: MappingSource, span: Span) {
        let original = self.original(span);
        self.builder.close(frame, source, original, false);
    }

    /// Closes a frame for an embedding-relative span, keeping it even when
    /// nothing was emitted.
    pub(crate) fn close_raw(&mut self, frame: Frame, source: MappingSource, original: Span) {
        self.builder.close(frame, source, original, true);
    }

    /// Emits `text` mapped to the template-relative `span`.
    pub(crate) fn identifier(&mut self, text: &str, name: &str, span: Span) {
        let frame = self.builder.open();
        self.builder.push_str(text);
        let original = self.original(span);
        self.builder
            .close(frame, MappingSource::Identifier(name.into()), original, true);
    }

    /// Records a zero-width node for `span`.
    pub(crate) fn nothing(&mut self, source: MappingSource, span: Span) {
        let frame = self.builder.open();
        let original = self.original(span);
        self.builder.close(frame, source, original, true);
    }

    pub(crate) fn error(&mut self, kind: TransformErrorKind, message: impl Into<String>, span: Span) {
        let location = self.original(span);
        self.errors
            .push(TransformError::new(kind, message, self.file, location));
    }

    /// Records a directive. Both spans are embedding-relative.
    pub(crate) fn directive(&mut self, kind: DirectiveKind, location: Span, area_of_effect: Span) {
        self.directives.push(Directive {
            kind,
            file: self.file.to_owned(),
            location,
            area_of_effect,
            match_count: 0,
        });
    }

    pub(crate) fn finish(
        self,
        embedding: Span,
    ) -> (String, MappingTree, Vec<TransformError>, Vec<Directive>) {
        let (code, mapping) = self
            .builder
            .finish(MappingSource::TemplateEmbedding, embedding);
        (code, mapping, self.errors, self.directives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_spans_are_shifted_into_embedding() {
        let mut mapper = Mapper::new(Utf8Path::new("a.ts"), TextSize::from(4));
        mapper.text("x = ");
        mapper.identifier("foo", "foo", Span::from_usize(3, 6));
        mapper.error(TransformErrorKind::Structural, "bad", Span::from_usize(0, 2));

        let (code, mapping, errors, _) = mapper.finish(Span::from_usize(0, 12));
        assert_eq!(code, "x = foo");
        assert_eq!(mapping.children[0].original, Span::from_usize(7, 10));
        assert_eq!(mapping.children[0].transformed, Span::from_usize(4, 7));
        assert_eq!(errors[0].location, Span::from_usize(4, 6));
    }

    #[test]
    fn test_newline_uses_indentation() {
        let mut mapper = Mapper::new(Utf8Path::new("a.ts"), TextSize::from(0));
        mapper.text("{");
        mapper.indent();
        mapper.newline();
        mapper.text("a;");
        mapper.dedent();
        mapper.newline();
        mapper.text("}");
        let (code, ..) = mapper.finish(Span::from_usize(0, 0));
        assert_eq!(code, "{\n  a;\n}");
    }

    #[test]
    fn test_empty_frames_are_dropped_but_markers_kept() {
        let mut mapper = Mapper::new(Utf8Path::new("a.ts"), TextSize::from(0));
        let frame = mapper.open();
        mapper.close(frame, MappingSource::Node("Empty"), Span::from_usize(0, 1));
        mapper.nothing(MappingSource::TextContent, Span::from_usize(1, 4));
        let (_, mapping, ..) = mapper.finish(Span::from_usize(0, 4));
        assert_eq!(mapping.children.len(), 1);
        assert_eq!(mapping.children[0].source, MappingSource::TextContent);
        assert!(mapping.children[0].transformed.is_empty());
    }
}
