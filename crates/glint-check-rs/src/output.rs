//! Output formatting.

use crate::cli::OutputFormat;
use glint_diagnostics::{Diagnostic, Severity};
use serde::Serialize;
use source_map::{ByteOffset, LineCol, LineIndex};

/// A formatted diagnostic for output.
#[derive(Debug, Serialize)]
pub struct FormattedDiagnostic {
    #[serde(rename = "type")]
    pub diagnostic_type: &'static str,
    pub filename: String,
    pub start: Position,
    pub end: Position,
    pub message: String,
    pub code: u32,
}

/// A position in the source.
#[derive(Debug, Serialize)]
pub struct Position {
    /// 1-indexed line number.
    pub line: u32,
    /// 1-indexed column number.
    pub column: u32,
    /// Byte offset.
    pub offset: u32,
}

impl Position {
    fn at(line_index: Option<&LineIndex>, offset: u32) -> Self {
        let (line, column) = line_index
            .and_then(|index| index.line_col(ByteOffset::from(offset)))
            .unwrap_or(LineCol::new(0, 0))
            .one_based();
        Self {
            line,
            column,
            offset,
        }
    }
}

/// Formats diagnostics for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the diagnostics of one file. `source` is the file's original
    /// text, used for line and column numbers.
    pub fn format(&self, diagnostics: &[Diagnostic], source: Option<&str>) -> String {
        let formatted = Self::format_diagnostics(diagnostics, source);
        match self.format {
            OutputFormat::Human => format_human(&formatted),
            OutputFormat::Json => {
                serde_json::to_string_pretty(&formatted).unwrap_or_default()
            }
            OutputFormat::Machine => format_machine(&formatted),
        }
    }

    /// Converts diagnostics into their serializable form.
    pub fn format_diagnostics(
        diagnostics: &[Diagnostic],
        source: Option<&str>,
    ) -> Vec<FormattedDiagnostic> {
        let line_index = source.map(LineIndex::new);
        diagnostics
            .iter()
            .map(|diag| FormattedDiagnostic {
                diagnostic_type: severity_label(diag.severity),
                filename: diag.file.to_string(),
                start: Position::at(line_index.as_ref(), diag.start),
                end: Position::at(line_index.as_ref(), diag.start + diag.length),
                message: diag.message.clone(),
                code: diag.code,
            })
            .collect()
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "Error",
        Severity::Warning => "Warning",
        Severity::Suggestion => "Suggestion",
        Severity::Message => "Message",
    }
}

fn format_human(diagnostics: &[FormattedDiagnostic]) -> String {
    let mut output = String::new();
    for diag in diagnostics {
        output.push_str(&format!(
            "{}:{}:{}\n{}: {} ({})\n\n",
            diag.filename,
            diag.start.line,
            diag.start.column,
            diag.diagnostic_type,
            diag.message,
            diag.code
        ));
    }
    output
}

fn format_machine(diagnostics: &[FormattedDiagnostic]) -> String {
    let mut output = String::new();
    for diag in diagnostics {
        output.push_str(&format!(
            "{} {}:{}:{}:{}:{} {} ({})\n",
            diag.diagnostic_type.to_uppercase(),
            diag.filename,
            diag.start.line,
            diag.start.column,
            diag.end.line,
            diag.end.column,
            diag.message,
            diag.code
        ));
    }
    output
}

/// Summary of a check run.
#[derive(Debug, Default)]
pub struct CheckSummary {
    pub file_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub fail_on_warnings: bool,
}

impl CheckSummary {
    /// Whether the run should exit with a failure status.
    pub fn failed(&self) -> bool {
        self.error_count > 0 || (self.fail_on_warnings && self.warning_count > 0)
    }

    /// Formats the summary line.
    pub fn format(&self) -> String {
        let plural = |count: usize, word: &str| {
            if count == 1 {
                format!("{count} {word}")
            } else {
                format!("{count} {word}s")
            }
        };

        format!(
            "====================================\nglint-check found {} and {} in {}",
            plural(self.error_count, "error"),
            plural(self.warning_count, "warning"),
            plural(self.file_count, "file"),
        )
    }
}
