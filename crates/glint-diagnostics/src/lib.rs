//! Diagnostic relocation for glint-check-rs.
//!
//! A type checker run over [`glint_transform::TransformedModule`] contents
//! reports positions in generated TypeScript. This crate moves those
//! diagnostics back to the templates and scripts they came from, applies
//! `@glint-ignore`, `@glint-expect-error` and `@glint-nocheck` directives,
//! and turns template compilation errors into diagnostics of the same shape.
//!
//! # Example
//!
//! ```
//! use camino::Utf8Path;
//! use glint_diagnostics::{rewrite_diagnostics, Diagnostic};
//! use glint_transform::{rewrite_module, GlintEnvironment, SourceFile};
//! use source_map::Span;
//!
//! let script = SourceFile::new("hello.gts", "export default <template>{{@name}}</template>\n");
//! let module = rewrite_module(&script, None, &GlintEnvironment::default())
//!     .unwrap()
//!     .unwrap();
//!
//! let at = module.transformed_contents().find("args.name").unwrap() + 5;
//! let diagnostic = Diagnostic::new(
//!     Utf8Path::new("hello.gts"),
//!     Span::from_usize(at, at + 4),
//!     "Property 'name' does not exist.",
//!     2339,
//! );
//! let result = rewrite_diagnostics([diagnostic], &[module][..]);
//! assert_eq!(result.diagnostics[0].start, 28);
//! ```

mod diagnostic;
mod rewrite;

pub use diagnostic::{
    parse_diagnostics, Diagnostic, DiagnosticsParseError, RelatedInformation, Severity,
    TRANSFORM_ERROR_CODE, UNUSED_DIRECTIVE_CODE,
};
pub use rewrite::{rewrite_diagnostics, transform_error_diagnostics, ModuleLookup, RewrittenDiagnostics};
