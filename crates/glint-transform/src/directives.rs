//! `@glint-*` suppression directives.

use camino::Utf8PathBuf;
use source_map::Span;

/// What a directive does to diagnostics in its area of effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// `@glint-ignore`: drop matching diagnostics.
    Ignore,
    /// `@glint-expect-error`: drop matching diagnostics and complain when
    /// there are none.
    ExpectError,
    /// `@glint-nocheck`: drop every diagnostic in the template.
    NoCheck,
}

impl DirectiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveKind::Ignore => "ignore",
            DirectiveKind::ExpectError => "expect-error",
            DirectiveKind::NoCheck => "nocheck",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "ignore" => Some(DirectiveKind::Ignore),
            "expect-error" => Some(DirectiveKind::ExpectError),
            "nocheck" => Some(DirectiveKind::NoCheck),
            _ => None,
        }
    }
}

/// A directive found in a template, in original file coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub file: Utf8PathBuf,
    /// The comment that declared the directive.
    pub location: Span,
    /// The range of source whose diagnostics the directive applies to.
    pub area_of_effect: Span,
    /// Diagnostics matched so far.
    pub match_count: u32,
}

impl Directive {
    pub(crate) fn shifted(mut self, delta: u32) -> Self {
        self.location = self.location.shift(delta);
        self.area_of_effect = self.area_of_effect.shift(delta);
        self
    }
}

/// The result of looking at a comment's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recognized<'a> {
    Directive(DirectiveKind),
    /// `@glint-<keyword>` with a keyword that is not a directive.
    Unknown(&'a str),
    /// Any other comment.
    NotADirective,
}

/// Classifies a comment. Leading and trailing whitespace is ignored; text
/// after the keyword (separated by `:` or whitespace) is free-form.
pub fn recognize(comment: &str) -> Recognized<'_> {
    let Some(rest) = comment.trim().strip_prefix("@glint-") else {
        return Recognized::NotADirective;
    };
    let end = rest
        .find(|c: char| c.is_whitespace() || c == ':')
        .unwrap_or(rest.len());
    let keyword = &rest[..end];
    match DirectiveKind::from_keyword(keyword) {
        Some(kind) => Recognized::Directive(kind),
        None => Recognized::Unknown(keyword),
    }
}
