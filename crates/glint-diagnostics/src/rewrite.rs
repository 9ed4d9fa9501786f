//! Moving checker diagnostics from generated code back to templates.

use camino::{Utf8Path, Utf8PathBuf};
use glint_transform::{Directive, DirectiveKind, TransformedModule};
use rustc_hash::FxHashMap;
use source_map::Span;
use std::collections::HashMap;
use std::hash::BuildHasher;

use crate::diagnostic::{Diagnostic, RelatedInformation};

/// Finds the transformed module a checker saw for a file.
///
/// Checkers report against the module's original file name, whose contents
/// they were given as [`TransformedModule::transformed_contents`].
pub trait ModuleLookup {
    fn module_for(&self, file: &Utf8Path) -> Option<&TransformedModule>;

    /// Every module, in a stable order.
    fn modules(&self) -> Vec<&TransformedModule>;
}

impl<S: BuildHasher> ModuleLookup for HashMap<Utf8PathBuf, TransformedModule, S> {
    fn module_for(&self, file: &Utf8Path) -> Option<&TransformedModule> {
        self.get(file)
    }

    fn modules(&self) -> Vec<&TransformedModule> {
        let mut modules: Vec<_> = self.values().collect();
        modules.sort_by(|a, b| a.original_file_name().cmp(b.original_file_name()));
        modules
    }
}

impl ModuleLookup for [TransformedModule] {
    fn module_for(&self, file: &Utf8Path) -> Option<&TransformedModule> {
        self.iter().find(|module| module.original_file_name() == file)
    }

    fn modules(&self) -> Vec<&TransformedModule> {
        self.iter().collect()
    }
}

/// The result of [`rewrite_diagnostics`].
#[derive(Debug, Clone, Default)]
pub struct RewrittenDiagnostics {
    pub diagnostics: Vec<Diagnostic>,
    /// Copies of every module's directives with their final match counts.
    pub directives: Vec<Directive>,
}

/// Relocates `diagnostics` into original coordinates and applies the
/// directives of the modules they belong to.
///
/// Diagnostics for files without a module pass through unchanged. Each
/// `@glint-expect-error` that suppressed nothing adds an "unused directive"
/// diagnostic.
pub fn rewrite_diagnostics(
    diagnostics: impl IntoIterator<Item = Diagnostic>,
    lookup: &(impl ModuleLookup + ?Sized),
) -> RewrittenDiagnostics {
    let modules = lookup.modules();
    let mut directives: FxHashMap<&Utf8Path, Vec<Directive>> = modules
        .iter()
        .map(|module| (module.original_file_name(), module.directives().to_vec()))
        .collect();

    let mut kept = Vec::new();
    let mut suppressed = 0usize;
    for diagnostic in diagnostics {
        let Some(module) = lookup.module_for(&diagnostic.file) else {
            kept.push(diagnostic);
            continue;
        };

        let diagnostic = relocate(diagnostic, module, lookup);
        let span = diagnostic.span();
        let matching = directives
            .get_mut(module.original_file_name())
            .and_then(|directives| {
                directives.iter_mut().find(|directive| {
                    directive.file == diagnostic.file && directive.area_of_effect.intersects(span)
                })
            });

        match matching {
            Some(directive) => {
                directive.match_count += 1;
                suppressed += 1;
            }
            None => kept.push(diagnostic),
        }
    }

    let directives: Vec<Directive> = modules
        .iter()
        .filter_map(|module| directives.remove(module.original_file_name()))
        .flatten()
        .collect();
    kept.extend(
        directives
            .iter()
            .filter(|directive| directive.kind == DirectiveKind::ExpectError && directive.match_count == 0)
            .map(Diagnostic::unused_directive),
    );

    tracing::debug!(
        kept = kept.len(),
        suppressed,
        directives = directives.len(),
        "rewrote diagnostics"
    );
    RewrittenDiagnostics {
        diagnostics: kept,
        directives,
    }
}

/// Converts the template errors of `module` into diagnostics.
pub fn transform_error_diagnostics(module: &TransformedModule) -> Vec<Diagnostic> {
    module.errors().iter().map(Diagnostic::from).collect()
}

fn relocate(
    mut diagnostic: Diagnostic,
    module: &TransformedModule,
    lookup: &(impl ModuleLookup + ?Sized),
) -> Diagnostic {
    if let Some((file, span)) = original_range(module, diagnostic.span()) {
        diagnostic.file = file;
        diagnostic.start = span.start.into();
        diagnostic.length = span.len().into();
    }
    diagnostic.related = std::mem::take(&mut diagnostic.related)
        .into_iter()
        .map(|related| relocate_related(related, lookup))
        .collect();
    diagnostic
}

fn relocate_related(
    mut related: RelatedInformation,
    lookup: &(impl ModuleLookup + ?Sized),
) -> RelatedInformation {
    let mapped = lookup
        .module_for(&related.file)
        .and_then(|module| original_range(module, related.span()));
    if let Some((file, span)) = mapped {
        related.file = file;
        related.start = span.start.into();
        related.length = span.len().into();
    }
    related
}

/// Maps `span` back to its original file. A range that starts and ends in
/// different files collapses to its start.
fn original_range(module: &TransformedModule, span: Span) -> Option<(Utf8PathBuf, Span)> {
    let (start_file, _) = module.get_original_offset(span.start)?;
    let (end_file, _) = module.get_original_offset(span.end)?;
    let end = if start_file == end_file { span.end } else { span.start };
    let (file, range) = module.get_original_range(span.start, end)?;
    Some((file.to_owned(), range))
}
