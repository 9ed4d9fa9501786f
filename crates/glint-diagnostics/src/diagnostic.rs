//! Diagnostic types.

use camino::{Utf8Path, Utf8PathBuf};
use glint_transform::{Directive, TransformError};
use serde::{Deserialize, Serialize};
use source_map::Span;
use thiserror::Error;

/// Code reported for an `@glint-expect-error` that matched nothing.
pub const UNUSED_DIRECTIVE_CODE: u32 = 2578;

/// Code reported for problems found while compiling a template.
pub const TRANSFORM_ERROR_CODE: u32 = 0;

/// A diagnostic produced by a type checker, or by glint itself.
///
/// Positions are byte offsets into `file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub file: Utf8PathBuf,
    pub start: u32,
    pub length: u32,
    pub message: String,
    pub code: u32,
    #[serde(default)]
    pub severity: Severity,
    /// Other locations the diagnostic refers to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<RelatedInformation>,
}

impl Diagnostic {
    /// Creates an error diagnostic covering `span` of `file`.
    pub fn new(file: &Utf8Path, span: Span, message: impl Into<String>, code: u32) -> Self {
        Self {
            file: file.to_owned(),
            start: span.start.into(),
            length: span.len().into(),
            message: message.into(),
            code,
            severity: Severity::Error,
            related: Vec::new(),
        }
    }

    /// The range this diagnostic covers.
    pub fn span(&self) -> Span {
        Span::new(self.start, self.start.saturating_add(self.length))
    }

    /// The diagnostic for an `@glint-expect-error` that matched nothing.
    pub fn unused_directive(directive: &Directive) -> Self {
        Self::new(
            &directive.file,
            directive.location,
            "Unused '@glint-expect-error' directive.",
            UNUSED_DIRECTIVE_CODE,
        )
    }
}

impl From<&TransformError> for Diagnostic {
    fn from(error: &TransformError) -> Self {
        Self::new(
            &error.file,
            error.location,
            error.message.clone(),
            TRANSFORM_ERROR_CODE,
        )
    }
}

/// A secondary location attached to a [`Diagnostic`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedInformation {
    pub file: Utf8PathBuf,
    pub start: u32,
    pub length: u32,
    pub message: String,
}

impl RelatedInformation {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.start.saturating_add(self.length))
    }
}

/// The severity of a diagnostic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational output.
    Message,
    /// A hint or suggestion.
    Suggestion,
    /// A warning that doesn't prevent compilation.
    Warning,
    /// An error that should be fixed.
    #[default]
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Message => "message",
            Severity::Suggestion => "suggestion",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to read diagnostics produced by an external checker.
#[derive(Debug, Error)]
#[error("invalid diagnostics: {0}")]
pub struct DiagnosticsParseError(#[from] serde_json::Error);

/// Parses a JSON array of diagnostics.
pub fn parse_diagnostics(json: &str) -> Result<Vec<Diagnostic>, DiagnosticsParseError> {
    Ok(serde_json::from_str(json)?)
}
