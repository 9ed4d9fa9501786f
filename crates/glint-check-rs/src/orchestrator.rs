//! Check orchestration.

use crate::cli::{Args, OutputFormat};
use crate::config::{ConfigLoadError, GlintConfig};
use crate::fs::OsFileSystem;
use crate::output::{CheckSummary, FormattedDiagnostic, Formatter};
use camino::{Utf8Path, Utf8PathBuf};
use glint_diagnostics::{
    parse_diagnostics, rewrite_diagnostics, transform_error_diagnostics, Diagnostic,
    DiagnosticsParseError, Severity, TRANSFORM_ERROR_CODE,
};
use glint_transform::{
    find_companion_script, find_companion_template, rewrite_module, transform_path, ConfigError,
    EmbeddingPrefilter, FileSystem, RewriteError, SourceFile, TransformedModule,
};
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;
use walkdir::WalkDir;

/// Orchestration errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid glob pattern: {0}")]
    InvalidGlob(String),

    #[error(transparent)]
    Config(#[from] ConfigLoadError),

    #[error(transparent)]
    Environment(#[from] ConfigError),

    #[error("failed to read diagnostics from {path}: {source}")]
    ReadDiagnostics {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("invalid diagnostics in {path}: {source}")]
    ParseDiagnostics {
        path: Utf8PathBuf,
        source: DiagnosticsParseError,
    },
}

const DEFAULT_IGNORES: [&str; 3] = ["**/node_modules/**", "**/dist/**", "**/tmp/**"];

/// Everything a check run produced.
#[derive(Debug, Default)]
pub struct CheckOutcome {
    /// Transformed modules keyed by their original script file name.
    pub modules: HashMap<Utf8PathBuf, TransformedModule>,
    /// Every reported diagnostic, ordered by file and position.
    pub diagnostics: Vec<Diagnostic>,
    pub file_count: usize,
}

/// Runs the check and prints its results.
pub fn run(args: Args) -> Result<CheckSummary, OrchestratorError> {
    let workspace = resolve_workspace(&args.workspace);
    let outcome = check(&args, &workspace)?;
    let fs = OsFileSystem::new(workspace);

    for module in sorted_modules(&outcome.modules) {
        if args.emit_ts {
            eprintln!("=== TypeScript for {} ===", module.original_file_name());
            eprintln!("{}", module.transformed_contents());
        }
        if args.debug_mapping {
            eprintln!("=== Mapping for {} ===", module.original_file_name());
            eprintln!("{}", module.to_debug_string());
        }
    }

    let formatter = Formatter::new(args.output);
    let mut by_file: BTreeMap<&Utf8Path, Vec<Diagnostic>> = BTreeMap::new();
    for diagnostic in &outcome.diagnostics {
        by_file
            .entry(diagnostic.file.as_path())
            .or_default()
            .push(diagnostic.clone());
    }

    let mut json: Vec<FormattedDiagnostic> = Vec::new();
    for (file, diagnostics) in &by_file {
        let source = original_text(&outcome.modules, &fs, file);
        match args.output {
            OutputFormat::Json => {
                json.extend(Formatter::format_diagnostics(diagnostics, source.as_deref()));
            }
            OutputFormat::Human | OutputFormat::Machine => {
                print!("{}", formatter.format(diagnostics, source.as_deref()));
            }
        }
    }

    let summary = CheckSummary {
        file_count: outcome.file_count,
        error_count: count(&outcome.diagnostics, Severity::Error),
        warning_count: count(&outcome.diagnostics, Severity::Warning),
        fail_on_warnings: args.fail_on_warnings,
    };

    match args.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
        OutputFormat::Human => println!("{}", summary.format()),
        OutputFormat::Machine => {}
    }

    Ok(summary)
}

/// Transforms every template-bearing module under `workspace` and collects
/// diagnostics for them.
pub fn check(args: &Args, workspace: &Utf8Path) -> Result<CheckOutcome, OrchestratorError> {
    let config = GlintConfig::load(workspace, args.config.as_deref())?;
    match &config.path {
        Some(path) => tracing::info!(config = %path, "using configuration"),
        None => tracing::info!("using default environment"),
    }
    let environment = &config.environment;
    let prefilter = EmbeddingPrefilter::new(environment)?;
    let ignore_set = build_ignore_set(args.ignore.iter().chain(&config.exclude))?;
    let fs = OsFileSystem::new(workspace);

    let files = discover_files(workspace, &config.file_extensions(), &ignore_set);
    let file_count = files.len();
    let walked: HashSet<&Utf8Path> = files.iter().map(Utf8PathBuf::as_path).collect();
    tracing::info!(workspace = %workspace, files = file_count, "discovered files");

    let template_extension = environment
        .companion
        .as_ref()
        .map(|rules| rules.template_extension.as_str());

    let results: Vec<Result<Option<TransformedModule>, RewriteError>> = files
        .par_iter()
        .filter_map(|path| {
            let is_template =
                template_extension.is_some_and(|ext| path.as_str().ends_with(ext));
            if !is_template {
                return Some(transform_script(path, environment, &prefilter, &fs));
            }

            // The script's own pass picks up its template.
            let script = environment
                .companion
                .as_ref()
                .and_then(|rules| find_companion_script(path, rules, &fs));
            match script {
                Some(script) if walked.contains(script.as_path()) => None,
                _ => Some(transform_path(path, environment, &fs)),
            }
        })
        .collect();

    let mut modules = HashMap::new();
    let mut diagnostics = Vec::new();
    for result in results {
        match result {
            Ok(Some(module)) => {
                diagnostics.extend(transform_error_diagnostics(&module));
                modules.insert(module.original_file_name().to_owned(), module);
            }
            Ok(None) => {}
            Err(RewriteError::HostSyntax {
                file,
                message,
                span,
            }) => {
                diagnostics.push(Diagnostic::new(&file, span, message, TRANSFORM_ERROR_CODE));
            }
            Err(err @ RewriteError::Unreadable { .. }) => {
                eprintln!("Warning: {err}");
            }
        }
    }
    tracing::info!(modules = modules.len(), "transformed modules");

    if let Some(path) = &args.diagnostics {
        let external = load_external_diagnostics(path, workspace)?;
        let rewritten = rewrite_diagnostics(external, &modules);
        diagnostics.extend(rewritten.diagnostics);
    }

    diagnostics.sort_by(|a, b| (&a.file, a.start).cmp(&(&b.file, b.start)));
    Ok(CheckOutcome {
        modules,
        diagnostics,
        file_count,
    })
}

fn resolve_workspace(workspace: &Utf8Path) -> Utf8PathBuf {
    if workspace.is_relative() {
        std::env::current_dir()
            .ok()
            .and_then(|dir| Utf8PathBuf::try_from(dir).ok())
            .unwrap_or_default()
            .join(workspace)
    } else {
        workspace.to_owned()
    }
}

fn build_ignore_set<'a>(
    patterns: impl Iterator<Item = &'a String>,
) -> Result<GlobSet, OrchestratorError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| OrchestratorError::InvalidGlob(e.to_string()))?;
        builder.add(glob);
    }
    for pattern in DEFAULT_IGNORES {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder
        .build()
        .map_err(|e| OrchestratorError::InvalidGlob(e.to_string()))
}

/// Workspace-relative paths of the files to check, in a stable order.
fn discover_files(workspace: &Utf8Path, extensions: &[&str], ignore_set: &GlobSet) -> Vec<Utf8PathBuf> {
    let mut files: Vec<Utf8PathBuf> = WalkDir::new(workspace)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| Utf8PathBuf::try_from(e.into_path()).ok())
        .filter(|p| {
            let file_name = p.file_name().unwrap_or("");
            extensions.iter().any(|ext| file_name.ends_with(ext))
        })
        .filter_map(|p| p.strip_prefix(workspace).ok().map(Utf8Path::to_owned))
        .filter(|p| !ignore_set.is_match(p.as_str()))
        .collect();
    files.sort();
    files
}

fn transform_script(
    path: &Utf8Path,
    environment: &glint_transform::GlintEnvironment,
    prefilter: &EmbeddingPrefilter,
    fs: &OsFileSystem,
) -> Result<Option<TransformedModule>, RewriteError> {
    let contents = fs.read_file(path).ok_or_else(|| RewriteError::Unreadable {
        file: path.to_owned(),
    })?;
    let companion = environment
        .companion
        .as_ref()
        .and_then(|rules| find_companion_template(path, rules, fs));

    if companion.is_none() && !prefilter.may_contain_embedding(&contents) {
        return Ok(None);
    }

    let companion = companion
        .map(|template| {
            fs.read_file(&template)
                .map(|contents| SourceFile::new(template.clone(), contents))
                .ok_or(RewriteError::Unreadable { file: template })
        })
        .transpose()?;
    let module = rewrite_module(&SourceFile::new(path, contents), companion.as_ref(), environment)?;
    if let Some(module) = &module {
        tracing::debug!(
            file = %path,
            errors = module.errors().len(),
            directives = module.directives().len(),
            "transformed module"
        );
    }
    Ok(module)
}

/// Reads checker diagnostics, making their file names workspace-relative.
fn load_external_diagnostics(
    path: &Utf8Path,
    workspace: &Utf8Path,
) -> Result<Vec<Diagnostic>, OrchestratorError> {
    let json = std::fs::read_to_string(path).map_err(|source| OrchestratorError::ReadDiagnostics {
        path: path.to_owned(),
        source,
    })?;
    let mut diagnostics =
        parse_diagnostics(&json).map_err(|source| OrchestratorError::ParseDiagnostics {
            path: path.to_owned(),
            source,
        })?;

    for diagnostic in &mut diagnostics {
        relativize(&mut diagnostic.file, workspace);
        for related in &mut diagnostic.related {
            relativize(&mut related.file, workspace);
        }
    }
    Ok(diagnostics)
}

fn relativize(file: &mut Utf8PathBuf, workspace: &Utf8Path) {
    if let Ok(relative) = file.strip_prefix(workspace) {
        *file = relative.to_owned();
    }
}

fn sorted_modules(modules: &HashMap<Utf8PathBuf, TransformedModule>) -> Vec<&TransformedModule> {
    let mut sorted: Vec<_> = modules.values().collect();
    sorted.sort_by(|a, b| a.original_file_name().cmp(b.original_file_name()));
    sorted
}

/// The text of `file` as the user wrote it.
fn original_text(
    modules: &HashMap<Utf8PathBuf, TransformedModule>,
    fs: &OsFileSystem,
    file: &Utf8Path,
) -> Option<String> {
    modules
        .values()
        .find_map(|module| module.original_source(file))
        .map(str::to_owned)
        .or_else(|| fs.read_file(file))
}

fn count(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.severity == severity)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    struct Workspace {
        _dir: TempDir,
        root: Utf8PathBuf,
    }

    impl Workspace {
        fn new(files: &[(&str, &str)]) -> Self {
            let dir = TempDir::new().unwrap();
            let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
            for (path, contents) in files {
                let path = root.join(path);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, contents).unwrap();
            }
            Self { _dir: dir, root }
        }

        fn check(&self, extra: &[&str]) -> CheckOutcome {
            let mut argv = vec!["glint-check-rs", "--workspace", self.root.as_str()];
            argv.extend_from_slice(extra);
            check(&Args::parse_from(argv), &self.root).unwrap()
        }
    }

    #[test]
    fn test_relative_workspace() {
        let resolved = resolve_workspace(Utf8Path::new("app"));
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("app"));
    }

    #[test]
    fn test_plain_scripts_are_skipped() {
        let workspace = Workspace::new(&[
            ("app/util.ts", "export const x = 1;\n"),
            ("app/hello.gts", "export default <template>{{@name}}</template>\n"),
        ]);
        let outcome = workspace.check(&[]);
        assert_eq!(outcome.file_count, 2);
        let names: Vec<_> = outcome.modules.keys().map(|p| p.as_str()).collect();
        assert_eq!(names, vec!["app/hello.gts"]);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_companion_pairs_transform_once() {
        let workspace = Workspace::new(&[
            ("app/components/card.ts", "export default class Card {}\n"),
            ("app/components/card.hbs", "<h1>{{@title}}</h1>\n"),
            ("app/components/orphan.hbs", "{{this.x}}\n"),
        ]);
        let outcome = workspace.check(&[]);

        let mut names: Vec<_> = outcome.modules.keys().map(|p| p.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["app/components/card.ts", "app/components/orphan.ts"]);

        let card = &outcome.modules[Utf8Path::new("app/components/card.ts")];
        let files: Vec<_> = card.original_files().map(|p| p.as_str()).collect();
        assert!(files.contains(&"app/components/card.hbs"));
    }

    #[test]
    fn test_template_and_syntax_errors_are_reported() {
        let workspace = Workspace::new(&[
            ("app/bad.gts", "<template>{{! @glint-bogus }}</template>\n"),
            ("app/broken.gts", "const = ;\n<template>hi</template>\n"),
        ]);
        let outcome = workspace.check(&[]);

        let files: Vec<_> = outcome.diagnostics.iter().map(|d| d.file.as_str()).collect();
        assert_eq!(files, vec!["app/bad.gts", "app/broken.gts"]);
        assert_eq!(outcome.diagnostics[0].message, "Unknown directive @glint-bogus");
        assert_eq!(outcome.diagnostics[1].code, TRANSFORM_ERROR_CODE);
    }

    #[test]
    fn test_ignore_patterns() {
        let workspace = Workspace::new(&[
            ("app/a.gts", "<template>a</template>\n"),
            ("vendor/b.gts", "<template>b</template>\n"),
            ("node_modules/pkg/c.gts", "<template>c</template>\n"),
        ]);
        let outcome = workspace.check(&["--ignore", "vendor/**"]);
        assert_eq!(outcome.file_count, 1);
    }

    #[test]
    fn test_external_diagnostics_are_mapped() {
        let workspace = Workspace::new(&[(
            "app/hello.gts",
            "export default <template>{{@name}}</template>\n",
        )]);
        let outcome = workspace.check(&[]);
        let module = &outcome.modules[Utf8Path::new("app/hello.gts")];
        let at = module.transformed_contents().find("args.name").unwrap() + "args.".len();

        let absolute = workspace.root.join("app/hello.gts");
        let json = format!(
            r#"[{{"file":"{absolute}","start":{at},"length":4,"message":"Property 'name' does not exist.","code":2339}}]"#
        );
        fs::write(workspace.root.join("tsc.json"), json).unwrap();

        let diagnostics_path = workspace.root.join("tsc.json");
        let outcome = workspace.check(&["--diagnostics", diagnostics_path.as_str()]);
        assert_eq!(outcome.diagnostics.len(), 1);
        let diagnostic = &outcome.diagnostics[0];
        assert_eq!(diagnostic.file.as_str(), "app/hello.gts");
        assert_eq!((diagnostic.start, diagnostic.length), (28, 4));
    }

    #[test]
    fn test_invalid_glob() {
        let workspace = Workspace::new(&[]);
        let args = Args::parse_from(["glint-check-rs", "--ignore", "a/[b"]);
        let err = check(&args, &workspace.root).unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidGlob(_)));
    }
}
