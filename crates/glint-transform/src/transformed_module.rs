//! The result of rewriting a module, and translation between its original
//! and transformed coordinates.

use std::fmt::Write as _;

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;
use source_map::{ByteOffset, MappingSource, MappingTree, Span};

use crate::directives::Directive;
use crate::error::TransformError;

/// A contiguous piece of the transformed module and the original source it
/// came from.
///
/// Pass-through spans copy script text unchanged and carry no mapping.
/// Transformed spans hold a compiled template; their mapping tree is in
/// span-local coordinates on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelatedSpan {
    pub original_file: Utf8PathBuf,
    pub original_range: Span,
    pub transformed_range: Span,
    pub transformed_source: String,
    pub mapping: Option<MappingTree>,
}

impl CorrelatedSpan {
    fn original_offset_for(&self, transformed: ByteOffset) -> ByteOffset {
        let local = transformed - self.transformed_range.start;
        let Some(mapping) = &self.mapping else {
            return self.original_range.start + local.min(self.original_range.len());
        };
        let node = mapping
            .narrowest_for_transformed(Span::empty(local))
            .unwrap_or(mapping);
        self.original_range.start + node.original_offset_for(local)
    }

    fn transformed_offset_for(&self, original: ByteOffset) -> ByteOffset {
        let local = original - self.original_range.start;
        let Some(mapping) = &self.mapping else {
            return self.transformed_range.start + local.min(self.transformed_range.len());
        };
        let node = mapping
            .narrowest_for_original(Span::empty(local))
            .unwrap_or(mapping);
        self.transformed_range.start + node.transformed_offset_for(local)
    }

    fn original_range_for(&self, transformed: Span) -> Span {
        if let Some(mapping) = &self.mapping {
            let local = Span::new(
                transformed.start - self.transformed_range.start,
                transformed.end - self.transformed_range.start,
            );
            if let Some(node) = mapping.narrowest_for_transformed(local) {
                if node.original.len() != node.transformed.len() {
                    return node.original.shift(self.original_range.start);
                }
            }
        }
        Span::new(
            self.original_offset_for(transformed.start),
            self.original_offset_for(transformed.end),
        )
    }

    fn transformed_range_for(&self, original: Span) -> Span {
        if let Some(mapping) = &self.mapping {
            let local = Span::new(
                original.start - self.original_range.start,
                original.end - self.original_range.start,
            );
            if let Some(node) = mapping.narrowest_for_original(local) {
                if node.original.len() != node.transformed.len() {
                    return node.transformed.shift(self.transformed_range.start);
                }
            }
        }
        Span::new(
            self.transformed_offset_for(original.start),
            self.transformed_offset_for(original.end),
        )
    }
}

/// Where a template sits in its original file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateBounds {
    /// The whole embedding, delimiters included.
    pub embedding: Span,
    /// The template source.
    pub content: Span,
    /// The compiled template in the transformed module.
    pub transformed: Span,
}

/// A module with its templates compiled to TypeScript.
///
/// Immutable once built. Ranges are byte offsets; range ends are inclusive
/// when looking up spans, so an offset on the boundary between two spans
/// belongs to the earlier one.
#[derive(Debug, Clone)]
pub struct TransformedModule {
    transformed_contents: String,
    errors: Vec<TransformError>,
    directives: Vec<Directive>,
    correlated_spans: Vec<CorrelatedSpan>,
    original_file_name: Utf8PathBuf,
    original_sources: FxHashMap<Utf8PathBuf, String>,
    /// Span indices per original file, in original order.
    spans_by_file: FxHashMap<Utf8PathBuf, Vec<usize>>,
}

impl TransformedModule {
    pub(crate) fn new(
        original_file_name: Utf8PathBuf,
        original_sources: FxHashMap<Utf8PathBuf, String>,
        correlated_spans: Vec<CorrelatedSpan>,
        errors: Vec<TransformError>,
        directives: Vec<Directive>,
    ) -> Self {
        let mut transformed_contents = String::new();
        let mut spans_by_file: FxHashMap<Utf8PathBuf, Vec<usize>> = FxHashMap::default();
        for (index, span) in correlated_spans.iter().enumerate() {
            debug_assert_eq!(
                span.transformed_range.start_usize(),
                transformed_contents.len(),
                "correlated spans must be contiguous"
            );
            transformed_contents.push_str(&span.transformed_source);
            spans_by_file
                .entry(span.original_file.clone())
                .or_default()
                .push(index);
        }
        for indices in spans_by_file.values_mut() {
            indices.sort_by_key(|&index| correlated_spans[index].original_range.start);
        }

        Self {
            transformed_contents,
            errors,
            directives,
            correlated_spans,
            original_file_name,
            original_sources,
            spans_by_file,
        }
    }

    pub fn transformed_contents(&self) -> &str {
        &self.transformed_contents
    }

    pub fn errors(&self) -> &[TransformError] {
        &self.errors
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn correlated_spans(&self) -> &[CorrelatedSpan] {
        &self.correlated_spans
    }

    /// The script this module was produced from.
    pub fn original_file_name(&self) -> &Utf8Path {
        &self.original_file_name
    }

    /// Every original file that contributed to this module.
    pub fn original_files(&self) -> impl Iterator<Item = &Utf8Path> {
        self.original_sources.keys().map(Utf8PathBuf::as_path)
    }

    pub fn original_source(&self, file: &Utf8Path) -> Option<&str> {
        self.original_sources.get(file).map(String::as_str)
    }

    fn span_index_at_transformed(&self, offset: ByteOffset) -> Option<usize> {
        let index = self
            .correlated_spans
            .partition_point(|span| span.transformed_range.end < offset);
        let span = self.correlated_spans.get(index)?;
        (span.transformed_range.start <= offset).then_some(index)
    }

    fn span_at_original(&self, file: &Utf8Path, offset: ByteOffset) -> Option<&CorrelatedSpan> {
        let indices = self.spans_by_file.get(file)?;
        let position =
            indices.partition_point(|&index| self.correlated_spans[index].original_range.end < offset);
        let span = &self.correlated_spans[*indices.get(position)?];
        (span.original_range.start <= offset).then_some(span)
    }

    /// Translates a transformed offset to its original file and offset.
    pub fn get_original_offset(&self, offset: ByteOffset) -> Option<(&Utf8Path, ByteOffset)> {
        let span = &self.correlated_spans[self.span_index_at_transformed(offset)?];
        Some((&span.original_file, span.original_offset_for(offset)))
    }

    /// Translates a transformed range to its original file and range.
    ///
    /// # Panics
    ///
    /// Panics if the range starts and ends in different original files.
    pub fn get_original_range(
        &self,
        start: ByteOffset,
        end: ByteOffset,
    ) -> Option<(&Utf8Path, Span)> {
        let end_index = self.span_index_at_transformed(end)?;
        let end_span = &self.correlated_spans[end_index];
        if start >= end_span.transformed_range.start {
            let range = end_span.original_range_for(Span::new(start, end));
            return Some((&end_span.original_file, range));
        }

        let start_span = &self.correlated_spans[self.span_index_at_transformed(start)?];
        assert_eq!(
            start_span.original_file, end_span.original_file,
            "transformed range {start:?}..{end:?} crosses original files"
        );
        let range = Span::new(
            start_span.original_offset_for(start),
            end_span.original_offset_for(end),
        );
        Some((&end_span.original_file, range))
    }

    /// Translates an offset in an original file to a transformed offset.
    pub fn get_transformed_offset(&self, file: &Utf8Path, offset: ByteOffset) -> Option<ByteOffset> {
        let span = self.span_at_original(file, offset)?;
        Some(span.transformed_offset_for(offset))
    }

    /// Translates a range in an original file to a transformed range.
    pub fn get_transformed_range(
        &self,
        file: &Utf8Path,
        start: ByteOffset,
        end: ByteOffset,
    ) -> Option<Span> {
        let end_span = self.span_at_original(file, end)?;
        if start >= end_span.original_range.start {
            return Some(end_span.transformed_range_for(Span::new(start, end)));
        }
        let start_span = self.span_at_original(file, start)?;
        Some(Span::new(
            start_span.transformed_offset_for(start),
            end_span.transformed_offset_for(end),
        ))
    }

    /// Finds the template whose embedding contains `offset` in `file`.
    pub fn find_template_at_original_offset(
        &self,
        file: &Utf8Path,
        offset: ByteOffset,
    ) -> Option<TemplateBounds> {
        let indices = self.spans_by_file.get(file)?;
        indices
            .iter()
            .map(|&index| &self.correlated_spans[index])
            .find(|span| span.mapping.is_some() && span.original_range.contains_inclusive(offset))
            .and_then(|span| {
                let mapping = span.mapping.as_ref()?;
                let content = mapping
                    .children
                    .iter()
                    .find(|child| child.source == MappingSource::Template)
                    .map_or(mapping.original, |template| template.original);
                Some(TemplateBounds {
                    embedding: span.original_range,
                    content: content.shift(span.original_range.start),
                    transformed: span.transformed_range,
                })
            })
    }

    /// Renders every correlated span and mapping tree.
    pub fn to_debug_string(&self) -> String {
        let mut out = String::from("TransformedModule\n\n");
        for span in &self.correlated_spans {
            let Some(mapping) = &span.mapping else {
                continue;
            };
            let original = self
                .original_source(&span.original_file)
                .and_then(|source| span.original_range.slice(source))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "{} {} -> {}",
                span.original_file, span.original_range, span.transformed_range
            );
            out.push_str(&mapping.to_debug_string(original, &span.transformed_source));
            out.push('\n');
        }
        out
    }
}
