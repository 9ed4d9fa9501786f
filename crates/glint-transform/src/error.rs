//! Error types for template transformation.

use camino::{Utf8Path, Utf8PathBuf};
use source_map::Span;
use thiserror::Error;

/// The category of a problem found while compiling a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformErrorKind {
    /// The template parser rejected the template.
    TemplateSyntax,
    /// A special form was used with the wrong arity, kind or position.
    SemanticForm,
    /// An unknown `@glint-` directive.
    Directive,
    /// Named blocks mixed with content, invalid block params and the like.
    Structural,
}

impl TransformErrorKind {
    /// Returns the kind as a short kebab-case code.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformErrorKind::TemplateSyntax => "template-syntax",
            TransformErrorKind::SemanticForm => "semantic-form",
            TransformErrorKind::Directive => "directive",
            TransformErrorKind::Structural => "structural",
        }
    }
}

impl std::fmt::Display for TransformErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem in a template, located in original source coordinates.
///
/// These are data, not failures: a module with template errors still
/// produces a [`crate::TransformedModule`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransformError {
    pub kind: TransformErrorKind,
    pub message: String,
    /// The file the template lives in.
    pub file: Utf8PathBuf,
    pub location: Span,
}

impl TransformError {
    /// Creates a new error.
    pub fn new(
        kind: TransformErrorKind,
        message: impl Into<String>,
        file: &Utf8Path,
        location: Span,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            file: file.to_owned(),
            location,
        }
    }

    /// Moves the location forward by `delta` bytes.
    pub(crate) fn shifted(mut self, delta: u32) -> Self {
        self.location = self.location.shift(delta);
        self
    }
}

/// A failure that prevents a module from being transformed at all.
#[derive(Debug, Clone, Error)]
pub enum RewriteError {
    /// The host source outside any template failed to parse.
    #[error("{file}: {message}")]
    HostSyntax {
        file: Utf8PathBuf,
        message: String,
        span: Span,
    },

    /// A file the transform needed could not be read.
    #[error("unable to read {file}")]
    Unreadable { file: Utf8PathBuf },
}

/// An invalid environment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid environment configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid prefilter pattern: {0}")]
    Pattern(#[from] regex::Error),
}
