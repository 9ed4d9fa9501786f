//! Span and byte offset types for source positions.

use text_size::{TextRange, TextSize};

/// A byte offset into a source string.
pub type ByteOffset = TextSize;

/// A half-open byte range `[start, end)` in some source text.
///
/// Spans are used for both template-relative and module-relative positions;
/// [`Span::shift`] moves a span from one coordinate space into another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    /// The start byte offset (inclusive).
    pub start: ByteOffset,
    /// The end byte offset (exclusive).
    pub end: ByteOffset,
}

impl Span {
    /// Creates a new span from start and end byte offsets.
    #[inline]
    pub fn new(start: impl Into<ByteOffset>, end: impl Into<ByteOffset>) -> Self {
        let start = start.into();
        let end = end.into();
        debug_assert!(start <= end, "span start {start:?} is after end {end:?}");
        Self { start, end }
    }

    /// Creates a span from `usize` offsets, as produced by string slicing.
    #[inline]
    pub fn from_usize(start: usize, end: usize) -> Self {
        Self::new(TextSize::from(start as u32), TextSize::from(end as u32))
    }

    /// Creates an empty span at the given offset.
    #[inline]
    pub fn empty(offset: impl Into<ByteOffset>) -> Self {
        let offset = offset.into();
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Returns the length of this span in bytes.
    #[inline]
    pub fn len(&self) -> TextSize {
        self.end - self.start
    }

    /// Returns true if this span is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Start offset as `usize`, for slicing.
    #[inline]
    pub fn start_usize(&self) -> usize {
        u32::from(self.start) as usize
    }

    /// End offset as `usize`, for slicing.
    #[inline]
    pub fn end_usize(&self) -> usize {
        u32::from(self.end) as usize
    }

    /// Returns true if this span contains the given offset (end exclusive).
    #[inline]
    pub fn contains(&self, offset: ByteOffset) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Returns true if the offset lies in `[start, end]`.
    #[inline]
    pub fn contains_inclusive(&self, offset: ByteOffset) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Returns true if this span contains the given span entirely.
    #[inline]
    pub fn contains_span(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns true if the two spans share at least one position.
    ///
    /// An empty span intersects a non-empty one when it sits inside it
    /// (start inclusive, end exclusive).
    pub fn intersects(&self, other: Span) -> bool {
        if other.is_empty() {
            return self.contains(other.start);
        }
        if self.is_empty() {
            return other.contains(self.start);
        }
        other.start < self.end && self.start < other.end
    }

    /// Returns a span covering both this span and another.
    #[inline]
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: std::cmp::min(self.start, other.start),
            end: std::cmp::max(self.end, other.end),
        }
    }

    /// Moves the span forward by `delta` bytes.
    #[inline]
    pub fn shift(self, delta: impl Into<ByteOffset>) -> Span {
        let delta = delta.into();
        Span {
            start: self.start + delta,
            end: self.end + delta,
        }
    }

    /// Returns the text this span covers, if it is in bounds.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start_usize()..self.end_usize())
    }

    /// Converts this span to a `TextRange`.
    #[inline]
    pub fn to_range(self) -> TextRange {
        TextRange::new(self.start, self.end)
    }
}

impl From<TextRange> for Span {
    fn from(range: TextRange) -> Self {
        Self {
            start: range.start(),
            end: range.end(),
        }
    }
}

impl From<Span> for TextRange {
    fn from(span: Span) -> Self {
        TextRange::new(span.start, span.end)
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", u32::from(self.start), u32::from(self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_from_usize() {
        let span = Span::from_usize(3, 7);
        assert_eq!(span.start, TextSize::from(3));
        assert_eq!(span.end_usize(), 7);
        assert_eq!(span.len(), TextSize::from(4));
    }

    #[test]
    fn test_span_contains_boundaries() {
        let span = Span::new(5u32, 15u32);
        assert!(!span.contains(TextSize::from(4)));
        assert!(span.contains(TextSize::from(5)));
        assert!(!span.contains(TextSize::from(15)));
        assert!(span.contains_inclusive(TextSize::from(15)));
    }

    #[test]
    fn test_intersects() {
        let area = Span::new(10u32, 20u32);
        assert!(area.intersects(Span::new(15u32, 25u32)));
        assert!(area.intersects(Span::new(0u32, 11u32)));
        assert!(!area.intersects(Span::new(20u32, 30u32)));
        assert!(!area.intersects(Span::new(0u32, 10u32)));
        assert!(area.intersects(Span::empty(10u32)));
        assert!(!area.intersects(Span::empty(20u32)));
        assert!(!Span::empty(20u32).intersects(area));
    }

    #[test]
    fn test_shift_and_slice() {
        let span = Span::new(1u32, 4u32).shift(2u32);
        assert_eq!(span, Span::new(3u32, 6u32));
        assert_eq!(span.slice("abcdefgh"), Some("def"));
        assert_eq!(Span::new(6u32, 40u32).slice("abc"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Span::new(2u32, 9u32).to_string(), "2:9");
    }
}
