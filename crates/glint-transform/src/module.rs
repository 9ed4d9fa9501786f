//! Module rewriting: find every template embedding in a script, compile it
//! and splice the result into the surrounding code.

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use source_map::Span;
use swc_common::{sync::Lrc, FileName, SourceMap, Spanned};
use swc_ecma_ast::{
    ClassProp, Decl, DefaultDecl, Expr, ImportSpecifier, Module, ModuleDecl, ModuleExportName,
    ModuleItem, Stmt, TaggedTpl,
};
use swc_ecma_parser::{Parser, StringInput, Syntax, TsSyntax};
use swc_ecma_visit::{Visit, VisitWith};

use crate::companion::{find_companion_script, find_companion_template, FileSystem};
use crate::config::{GlintEnvironment, SpecialForms, TemplateConfig};
use crate::directives::Directive;
use crate::embeddings::{scan_native_templates, Placement};
use crate::error::{RewriteError, TransformError, TransformErrorKind};
use crate::template::{template_to_typescript, CompiledTemplate, TemplateOptions};
use crate::transformed_module::{CorrelatedSpan, TransformedModule};

/// A file's path and contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: Utf8PathBuf,
    pub contents: String,
}

impl SourceFile {
    pub fn new(path: impl Into<Utf8PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Rewrites `script`, compiling its embedded templates and, if given, its
/// companion template.
///
/// Returns `Ok(None)` when there is nothing to rewrite. Template problems are
/// reported in [`TransformedModule::errors`]; only a script that cannot be
/// parsed outside its templates fails.
pub fn rewrite_module(
    script: &SourceFile,
    companion: Option<&SourceFile>,
    environment: &GlintEnvironment,
) -> Result<Option<TransformedModule>, RewriteError> {
    let companion = companion.zip(environment.companion.as_ref());

    let (native, masked) = match &environment.native_template {
        Some(_) => {
            let scan = scan_native_templates(&script.contents).map_err(|err| {
                RewriteError::HostSyntax {
                    file: script.path.clone(),
                    message: err.to_string(),
                    span: err.span,
                }
            })?;
            (scan.embeddings, scan.masked)
        }
        None => (Vec::new(), script.contents.clone()),
    };

    let may_have_tags = environment
        .tag_sources()
        .any(|source| script.contents.contains(source));
    if native.is_empty() && companion.is_none() && !may_have_tags {
        return Ok(None);
    }

    let module = parse_host(&script.path, &masked)?;
    let module_info = ModuleInfo::collect(&module.module, &masked, module.base, environment);

    let mut rewriter = Rewriter {
        script,
        imported_forms: &module_info.imported_forms,
        replacements: Vec::new(),
        errors: Vec::new(),
        directives: Vec::new(),
    };

    for tagged in &module_info.tagged_templates {
        if tagged.has_interpolations {
            rewriter.errors.push(TransformError::new(
                TransformErrorKind::TemplateSyntax,
                "Templates with interpolations are not supported",
                &script.path,
                tagged.range,
            ));
            continue;
        }
        let wrapper = Wrapper {
            backing_value: tagged.is_static_member.then_some("this"),
            prepend: "",
            append: "",
        };
        rewriter.embed(tagged.range, tagged.content, tagged.config, wrapper);
    }

    if let Some(config) = &environment.native_template {
        for embedding in &native {
            let wrapper = match embedding.placement {
                Placement::ClassMember => Wrapper {
                    backing_value: Some("this"),
                    prepend: "static { ",
                    append: " }",
                },
                Placement::Expression => Wrapper::default(),
                Placement::TopLevel => Wrapper {
                    backing_value: None,
                    prepend: "export default ",
                    append: ";",
                },
            };
            rewriter.embed(embedding.range, embedding.content, config, wrapper);
        }
    }

    if let Some((template, rules)) = companion {
        let (at, wrapper) = match module_info.default_class_close {
            Some(brace) => (
                brace,
                Wrapper {
                    backing_value: Some("this"),
                    prepend: "static { ",
                    append: " }",
                },
            ),
            None => (
                script.contents.len(),
                Wrapper {
                    backing_value: None,
                    prepend: "\n",
                    append: ";",
                },
            ),
        };
        rewriter.attach_companion(template, at, &rules.template, wrapper);
    }

    let Rewriter {
        mut replacements,
        errors,
        directives,
        ..
    } = rewriter;

    if replacements.is_empty() && errors.is_empty() {
        return Ok(None);
    }

    replacements.sort_by_key(|replacement| replacement.range.start);
    let correlated_spans = correlate(script, replacements);
    tracing::debug!(
        file = %script.path,
        spans = correlated_spans.len(),
        errors = errors.len(),
        "rewrote module"
    );

    let mut sources = FxHashMap::default();
    sources.insert(script.path.clone(), script.contents.clone());
    if let Some((template, _)) = companion {
        sources.insert(template.path.clone(), template.contents.clone());
    }

    Ok(Some(TransformedModule::new(
        script.path.clone(),
        sources,
        correlated_spans,
        errors,
        directives,
    )))
}

/// Rewrites the module `path` belongs to, reading files through `fs`.
///
/// `path` may be a script or a companion template. A template without a
/// script is attached to an empty synthesized `.ts` module.
pub fn transform_path(
    path: &Utf8Path,
    environment: &GlintEnvironment,
    fs: &dyn FileSystem,
) -> Result<Option<TransformedModule>, RewriteError> {
    let read = |path: &Utf8Path| {
        fs.read_file(path)
            .map(|contents| SourceFile::new(path, contents))
            .ok_or_else(|| RewriteError::Unreadable {
                file: path.to_owned(),
            })
    };

    if let Some(rules) = &environment.companion {
        if path.as_str().ends_with(rules.template_extension.as_str()) {
            let template = read(path)?;
            let script = match find_companion_script(path, rules, fs) {
                Some(script) => read(&script)?,
                None => SourceFile::new(path.with_extension("ts"), ""),
            };
            return rewrite_module(&script, Some(&template), environment);
        }
    }

    let script = read(path)?;
    let companion = environment
        .companion
        .as_ref()
        .and_then(|rules| find_companion_template(path, rules, fs))
        .map(|template| read(&template))
        .transpose()?;
    rewrite_module(&script, companion.as_ref(), environment)
}

#[derive(Debug, Clone, Copy, Default)]
struct Wrapper {
    backing_value: Option<&'static str>,
    prepend: &'static str,
    append: &'static str,
}

/// Compiled code that replaces `range` of the script.
struct Replacement {
    range: Span,
    original_file: Utf8PathBuf,
    original_range: Span,
    compiled: CompiledTemplate,
}

struct Rewriter<'a> {
    script: &'a SourceFile,
    imported_forms: &'a [ImportedName],
    replacements: Vec<Replacement>,
    errors: Vec<TransformError>,
    directives: Vec<Directive>,
}

impl Rewriter<'_> {
    /// Compiles the template embedded at `range` of the script.
    fn embed(&mut self, range: Span, content: Span, config: &TemplateConfig, wrapper: Wrapper) {
        let embedding = range.slice(&self.script.contents).unwrap_or_default();
        let content = Span::new(content.start - range.start, content.end - range.start);
        let compiled = self.compile(&self.script.path, embedding, content, config, wrapper);

        let delta = u32::from(range.start);
        self.errors
            .extend(compiled.errors.iter().cloned().map(|error| error.shifted(delta)));
        self.directives
            .extend(compiled.directives.iter().cloned().map(|directive| directive.shifted(delta)));
        self.replacements.push(Replacement {
            range,
            original_file: self.script.path.clone(),
            original_range: range,
            compiled,
        });
    }

    /// Compiles a companion template and inserts it at `at` in the script.
    fn attach_companion(
        &mut self,
        template: &SourceFile,
        at: usize,
        config: &TemplateConfig,
        wrapper: Wrapper,
    ) {
        let whole = Span::from_usize(0, template.contents.len());
        let compiled = self.compile(&template.path, &template.contents, whole, config, wrapper);

        self.errors.extend(compiled.errors.iter().cloned());
        self.directives.extend(compiled.directives.iter().cloned());
        self.replacements.push(Replacement {
            range: Span::from_usize(at, at),
            original_file: template.path.clone(),
            original_range: whole,
            compiled,
        });
    }

    fn compile(
        &self,
        file: &Utf8Path,
        embedding: &str,
        content: Span,
        config: &TemplateConfig,
        wrapper: Wrapper,
    ) -> CompiledTemplate {
        let special_forms = self.special_forms_for(config);
        let options = TemplateOptions {
            file,
            types_module: &config.types_module,
            backing_value: wrapper.backing_value,
            prepend: wrapper.prepend,
            append: wrapper.append,
            preamble: &[],
            special_forms: &special_forms,
            globals: config.globals.as_deref(),
        };
        template_to_typescript(embedding, content, &options)
    }

    /// The configured forms plus any imported under a local name.
    fn special_forms_for(&self, config: &TemplateConfig) -> SpecialForms {
        let mut forms = config.special_forms.clone();
        for import in self.imported_forms {
            let form = config
                .special_form_imports
                .get(&import.source)
                .and_then(|names| names.get(&import.imported));
            if let Some(form) = form {
                forms.insert(import.local.clone(), *form);
            }
        }
        forms
    }
}

/// Interleaves pass-through spans of the script with the replacements.
fn correlate(script: &SourceFile, replacements: Vec<Replacement>) -> Vec<CorrelatedSpan> {
    let mut spans = Vec::with_capacity(replacements.len() * 2 + 1);
    let mut cursor = 0usize;
    let mut transformed = 0usize;

    let pass_through = |spans: &mut Vec<CorrelatedSpan>, from: usize, to: usize, at: &mut usize| {
        if to > from {
            spans.push(CorrelatedSpan {
                original_file: script.path.clone(),
                original_range: Span::from_usize(from, to),
                transformed_range: Span::from_usize(*at, *at + (to - from)),
                transformed_source: script.contents[from..to].to_string(),
                mapping: None,
            });
            *at += to - from;
        }
    };

    for replacement in replacements {
        pass_through(&mut spans, cursor, replacement.range.start_usize(), &mut transformed);

        let code = replacement.compiled.code;
        spans.push(CorrelatedSpan {
            original_file: replacement.original_file,
            original_range: replacement.original_range,
            transformed_range: Span::from_usize(transformed, transformed + code.len()),
            transformed_source: code,
            mapping: Some(replacement.compiled.mapping),
        });
        transformed = spans.last().map_or(transformed, |span| span.transformed_range.end_usize());
        cursor = replacement.range.end_usize();
    }
    pass_through(&mut spans, cursor, script.contents.len(), &mut transformed);

    spans
}

struct ParsedHost {
    module: Module,
    /// Position of the first byte in swc's source map.
    base: u32,
}

fn parse_host(path: &Utf8Path, masked: &str) -> Result<ParsedHost, RewriteError> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(
        FileName::Custom(path.to_string()).into(),
        masked.to_string(),
    );
    let syntax = Syntax::Typescript(TsSyntax {
        tsx: false,
        decorators: true,
        ..Default::default()
    });
    let base = fm.start_pos.0;
    let mut parser = Parser::new(syntax, StringInput::from(&*fm), None);
    match parser.parse_module() {
        Ok(module) => Ok(ParsedHost { module, base }),
        Err(err) => {
            let span = err.span();
            Err(RewriteError::HostSyntax {
                file: path.to_owned(),
                message: err.kind().msg().to_string(),
                span: Span::new(span.lo.0.saturating_sub(base), span.hi.0.saturating_sub(base)),
            })
        }
    }
}

/// An import binding that may name a special form.
#[derive(Debug, Clone)]
struct ImportedName {
    source: String,
    imported: SmolStr,
    local: SmolStr,
}

struct TaggedTemplate<'a> {
    range: Span,
    content: Span,
    config: &'a TemplateConfig,
    is_static_member: bool,
    has_interpolations: bool,
}

/// What the rewriter needs to know about the host module.
struct ModuleInfo<'a> {
    imported_forms: Vec<ImportedName>,
    tagged_templates: Vec<TaggedTemplate<'a>>,
    /// Offset of the closing brace of the default-exported class.
    default_class_close: Option<usize>,
}

impl<'a> ModuleInfo<'a> {
    fn collect(module: &Module, source: &str, base: u32, environment: &'a GlintEnvironment) -> Self {
        let offset = |pos: swc_common::BytePos| pos.0.saturating_sub(base) as usize;

        let mut imported_forms = Vec::new();
        let mut tags: FxHashMap<String, &'a TemplateConfig> = FxHashMap::default();
        for item in &module.body {
            let ModuleItem::ModuleDecl(ModuleDecl::Import(import)) = item else {
                continue;
            };
            let src = &source[offset(import.src.span.lo)..offset(import.src.span.hi)];
            let src = src.trim_matches(|c| c == '"' || c == '\'');
            for specifier in &import.specifiers {
                let (imported, local) = match specifier {
                    ImportSpecifier::Named(named) => {
                        let imported = match &named.imported {
                            Some(ModuleExportName::Ident(ident)) => SmolStr::new(&*ident.sym),
                            Some(ModuleExportName::Str(name)) => SmolStr::new(
                                source[offset(name.span.lo)..offset(name.span.hi)]
                                    .trim_matches(|c| c == '"' || c == '\''),
                            ),
                            None => SmolStr::new(&*named.local.sym),
                        };
                        (imported, SmolStr::new(&*named.local.sym))
                    }
                    ImportSpecifier::Default(default) => {
                        (SmolStr::new("default"), SmolStr::new(&*default.local.sym))
                    }
                    ImportSpecifier::Namespace(_) => continue,
                };
                if let Some(config) = environment.tag_config(src, &imported) {
                    tags.insert(local.to_string(), config);
                }
                imported_forms.push(ImportedName {
                    source: src.to_string(),
                    imported,
                    local,
                });
            }
        }

        let mut finder = TaggedTemplateFinder {
            source,
            base,
            tags: &tags,
            found: Vec::new(),
        };
        module.visit_with(&mut finder);

        let default_class_close = default_export_class_span(module).and_then(|span| {
            let end = offset(span.hi).min(source.len());
            source[..end].rfind('}')
        });

        Self {
            imported_forms,
            tagged_templates: finder.found,
            default_class_close,
        }
    }
}

fn default_export_class_span(module: &Module) -> Option<swc_common::Span> {
    let mut exported_name = None;
    for item in &module.body {
        match item {
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(export)) => {
                if let DefaultDecl::Class(class) = &export.decl {
                    return Some(class.class.span);
                }
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(export)) => {
                if let Expr::Ident(ident) = &*export.expr {
                    exported_name = Some(ident.sym.clone());
                }
            }
            _ => {}
        }
    }

    let name = exported_name?;
    module.body.iter().find_map(|item| {
        let decl = match item {
            ModuleItem::Stmt(Stmt::Decl(decl)) => decl,
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => &export.decl,
            _ => return None,
        };
        match decl {
            Decl::Class(class) if class.ident.sym == name => Some(class.class.span),
            _ => None,
        }
    })
}

struct TaggedTemplateFinder<'a, 'e> {
    source: &'a str,
    base: u32,
    tags: &'a FxHashMap<String, &'e TemplateConfig>,
    found: Vec<TaggedTemplate<'e>>,
}

impl TaggedTemplateFinder<'_, '_> {
    /// Records `tagged` if its tag is an imported template tag.
    fn record(&mut self, tagged: &TaggedTpl, is_static_member: bool) -> bool {
        let Expr::Ident(tag) = &*tagged.tag else {
            return false;
        };
        let Some(&config) = self.tags.get(&*tag.sym) else {
            return false;
        };

        let start = tagged.span.lo.0.saturating_sub(self.base) as usize;
        let end = (tagged.span.hi.0.saturating_sub(self.base) as usize).min(self.source.len());
        let tag_end = tag.span.hi.0.saturating_sub(self.base) as usize;
        let Some(open) = self.source[tag_end..end].find('`') else {
            return false;
        };
        let content = Span::from_usize(tag_end + open + 1, end.saturating_sub(1).max(tag_end + open + 1));

        tracing::debug!(tag = %tag.sym, start, end, "found tagged template");
        self.found.push(TaggedTemplate {
            range: Span::from_usize(start, end),
            content,
            config,
            is_static_member,
            has_interpolations: !tagged.tpl.exprs.is_empty(),
        });
        true
    }
}

impl Visit for TaggedTemplateFinder<'_, '_> {
    fn visit_class_prop(&mut self, prop: &ClassProp) {
        if prop.is_static {
            if let Some(Expr::TaggedTpl(tagged)) = prop.value.as_deref() {
                if self.record(tagged, true) {
                    return;
                }
            }
        }
        prop.visit_children_with(self);
    }

    fn visit_tagged_tpl(&mut self, tagged: &TaggedTpl) {
        if !self.record(tagged, false) {
            tagged.visit_children_with(self);
        }
    }
}
