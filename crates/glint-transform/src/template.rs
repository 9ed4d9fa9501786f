//! Template to TypeScript emission.
//!
//! [`template_to_typescript`] walks a parsed template and produces
//! TypeScript that references every value the template uses through the
//! environment's DSL, together with a [`MappingTree`] pairing each emitted
//! range with the template range it came from.

use camino::Utf8Path;
use glimmer_parser::{
    AttrNode, AttrValue, Block, BlockParam, BlockStatement, CallNode, ConcatPart, ConcatStatement,
    ElementModifierStatement, ElementNode, Expression, Hash, Literal, LiteralValue,
    MustacheCommentStatement, MustacheStatement, OpenTagPart, PathExpression, PathHead, Statement,
};
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use source_map::{MappingSource, MappingTree, Span};
use text_size::TextSize;

use crate::config::{SpecialForm, SpecialForms, TemplateConfig};
use crate::directives::{recognize, Directive, DirectiveKind, Recognized};
use crate::error::{TransformError, TransformErrorKind};
use crate::mapper::Mapper;
use crate::scope::ScopeTracker;
use crate::special_forms::{classify_special_form, SpecialFormInfo};

/// How one template is compiled.
#[derive(Debug, Clone)]
pub struct TemplateOptions<'a> {
    /// The file the template lives in, for errors and directives.
    pub file: &'a Utf8Path,
    pub types_module: &'a str,
    /// Expression passed to `templateForBackingValue`; `None` emits a
    /// `templateExpression` instead.
    pub backing_value: Option<&'a str>,
    /// Text placed before the generated expression.
    pub prepend: &'a str,
    /// Text placed after the generated expression.
    pub append: &'a str,
    /// Statements emitted at the top of the callback body.
    pub preamble: &'a [String],
    pub special_forms: &'a SpecialForms,
    pub globals: Option<&'a [SmolStr]>,
}

impl<'a> TemplateOptions<'a> {
    /// Options for a template expression compiled with `config`.
    pub fn from_config(file: &'a Utf8Path, config: &'a TemplateConfig) -> Self {
        Self {
            file,
            types_module: &config.types_module,
            backing_value: None,
            prepend: "",
            append: "",
            preamble: &[],
            special_forms: &config.special_forms,
            globals: config.globals.as_deref(),
        }
    }
}

/// The output of compiling one template.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    pub code: String,
    /// Original ranges are relative to the start of the embedding; generated
    /// ranges are relative to the start of `code`.
    pub mapping: MappingTree,
    pub errors: Vec<TransformError>,
    pub directives: Vec<Directive>,
}

/// Compiles the template at `content` within `embedding`.
///
/// `embedding` is the full embedding text including its delimiters (e.g.
/// `` hbs`...` `` or `<template>...</template>`); `content` is the range of
/// the template source inside it. A template that fails to parse still
/// produces the wrapper, with an empty body and one syntax error.
pub fn template_to_typescript(
    embedding: &str,
    content: Span,
    options: &TemplateOptions<'_>,
) -> CompiledTemplate {
    let source = content.slice(embedding).unwrap_or_default();
    let mut emitter = Emitter::new(options, content, embedding.len());

    emitter.emit_header();
    let frame = emitter.mapper.open();
    match glimmer_parser::parse(source) {
        Ok(template) => emitter.emit_statements(&template.body),
        Err(err) => {
            tracing::debug!(file = %options.file, error = %err, "template failed to parse");
            emitter
                .mapper
                .error(TransformErrorKind::TemplateSyntax, err.to_string(), err.span);
        }
    }
    emitter
        .mapper
        .close_raw(frame, MappingSource::Template, content);
    emitter.emit_footer();

    let (code, mapping, errors, directives) = emitter
        .mapper
        .finish(Span::from_usize(0, embedding.len()));
    CompiledTemplate {
        code,
        mapping,
        errors,
        directives,
    }
}

/// Walks one template. Special-form expansion lives in
/// [`crate::special_forms`].
pub(crate) struct Emitter<'a> {
    pub(crate) mapper: Mapper<'a>,
    pub(crate) scope: ScopeTracker,
    options: &'a TemplateOptions<'a>,
    globals: Option<FxHashSet<&'a str>>,
    /// Template contents within the embedding.
    content: Span,
    embedding_len: usize,
}

impl<'a> Emitter<'a> {
    fn new(options: &'a TemplateOptions<'a>, content: Span, embedding_len: usize) -> Self {
        Self {
            mapper: Mapper::new(options.file, content.start),
            scope: ScopeTracker::new(),
            options,
            globals: options
                .globals
                .map(|globals| globals.iter().map(SmolStr::as_str).collect()),
            content,
            embedding_len,
        }
    }

    /// Runs `emit` inside a mapping frame for the template-relative `span`.
    pub(crate) fn for_node(&mut self, kind: &'static str, span: Span, emit: impl FnOnce(&mut Self)) {
        let frame = self.mapper.open();
        emit(self);
        self.mapper.close(frame, MappingSource::Node(kind), span);
    }

    pub(crate) fn special_form(&self, callee: &Expression) -> Option<SpecialFormInfo> {
        classify_special_form(
            callee,
            self.options.special_forms,
            self.options.globals,
            &self.scope,
        )
    }

    fn is_global(&self, name: &str) -> bool {
        self.globals
            .as_ref()
            .map_or(true, |globals| globals.contains(name))
    }

    // === Boilerplate ===

    fn emit_header(&mut self) {
        let types = self.options.types_module;
        self.mapper.text(self.options.prepend);
        self.mapper
            .text(&format!("({{}} as typeof import(\"{types}\"))"));
        let callback =
            format!("function(__glintRef__, __glintDSL__: typeof import(\"{types}\")) {{");
        match self.options.backing_value {
            Some(backing) => self
                .mapper
                .text(&format!(".templateForBackingValue({backing}, {callback}")),
            None => self.mapper.text(&format!(".templateExpression({callback}")),
        }
        self.mapper.indent();
        for line in self.options.preamble {
            self.mapper.newline();
            self.mapper.text(line);
        }
    }

    fn emit_footer(&mut self) {
        self.mapper.newline();
        self.mapper.text("__glintRef__; __glintDSL__;");
        self.mapper.dedent();
        self.mapper.newline();
        self.mapper.text("})");
        self.mapper.text(self.options.append);
    }

    // === Statements ===

    pub(crate) fn emit_statements(&mut self, statements: &[Statement]) {
        for (index, statement) in statements.iter().enumerate() {
            match statement {
                Statement::Text(text) => self.mapper.nothing(MappingSource::TextContent, text.span),
                Statement::Comment(_) => {}
                Statement::MustacheComment(comment) => {
                    self.emit_comment(comment, next_significant(&statements[index + 1..]))
                }
                Statement::Mustache(mustache) => {
                    self.mapper.newline();
                    self.emit_top_level_mustache(mustache);
                }
                Statement::Block(block) => {
                    self.mapper.newline();
                    self.emit_block_statement(block);
                }
                Statement::Element(element) => {
                    self.mapper.newline();
                    self.emit_element(element);
                }
            }
        }
    }

    /// Handles a comment that may be a directive. `next` is the span of the
    /// node the directive applies to.
    fn emit_comment(&mut self, comment: &MustacheCommentStatement, next: Option<Span>) {
        match recognize(&comment.value) {
            Recognized::NotADirective => {}
            Recognized::Unknown(keyword) => {
                let message = format!("Unknown directive @glint-{keyword}");
                self.mapper
                    .error(TransformErrorKind::Directive, message, comment.span);
            }
            Recognized::Directive(DirectiveKind::NoCheck) => {
                let location = Span::new(self.content.start, self.mapper.original(comment.span).end);
                let area = Span::from_usize(0, self.embedding_len);
                self.mapper.directive(DirectiveKind::NoCheck, location, area);
            }
            Recognized::Directive(kind) => {
                let location = self.mapper.original(comment.span);
                let area = match next {
                    Some(span) => self.mapper.original(span),
                    None => Span::empty(location.end),
                };
                self.mapper.directive(kind, location, area);
            }
        }
    }

    fn emit_top_level_mustache(&mut self, mustache: &MustacheStatement) {
        if let Some(info) = self.special_form(&mustache.path) {
            if info.form == SpecialForm::Yield {
                self.emit_yield(mustache, &info);
                return;
            }
        }

        self.for_node("MustacheStatement", mustache.span, |e| {
            e.mapper.text("__glintDSL__.emitContent(");
            e.emit_mustache_value(mustache, false);
            e.mapper.text(");");
        });
    }

    fn emit_block_statement(&mut self, block: &BlockStatement) {
        if let Some(info) = self.special_form(&block.path) {
            match info.form {
                SpecialForm::If | SpecialForm::IfNot => self.emit_if_block(block, &info),
                _ => {
                    self.mapper.error(
                        TransformErrorKind::SemanticForm,
                        format!("{} is not valid as a block", block_form(&info.name)),
                        block.span,
                    );
                    self.emit_placeholder_block(block);
                }
            }
            return;
        }

        self.for_node("BlockStatement", block.span, |e| {
            e.mapper.text("{");
            e.mapper.indent();
            e.mapper.newline();
            e.mapper
                .text("const __glintY__ = __glintDSL__.emitComponent(");
            e.emit_resolve(block, "resolve");
            e.mapper.text(");");
            e.emit_block_contents(
                "default",
                None,
                &block.program.block_params,
                &block.program.body,
            );
            if let Some(inverse) = &block.inverse {
                e.emit_block_contents("else", None, &inverse.block_params, &inverse.body);
            }
            e.mapper.dedent();
            e.mapper.newline();
            e.mapper.text("}");
        });
    }

    /// Emits a block whose head could not be compiled: its arguments as a
    /// plain array and both arms with their params untyped.
    fn emit_placeholder_block(&mut self, block: &BlockStatement) {
        self.for_node("BlockStatement", block.span, |e| {
            e.mapper.text("{");
            e.mapper.indent();
            e.mapper.newline();
            e.mapper.text("[");
            e.emit_args(&block.params, &block.hash);
            e.mapper.text("];");
            e.emit_placeholder_arm(&block.program);
            if let Some(inverse) = &block.inverse {
                e.emit_placeholder_arm(inverse);
            }
            e.mapper.dedent();
            e.mapper.newline();
            e.mapper.text("}");
        });
    }

    fn emit_placeholder_arm(&mut self, arm: &Block) {
        self.mapper.newline();
        self.mapper.text("{");
        self.mapper.indent();
        if !arm.block_params.is_empty() {
            self.mapper.newline();
            self.mapper.text("const [");
            for (index, param) in arm.block_params.iter().enumerate() {
                if index > 0 {
                    self.mapper.text(", ");
                }
                self.emit_local_identifier(&param.name, param.span);
            }
            self.mapper.text("] = [] as any[];");
        }
        self.scope
            .push(arm.block_params.iter().map(|param| param.name.clone()));
        self.emit_statements(&arm.body);
        self.scope.pop();
        self.mapper.dedent();
        self.mapper.newline();
        self.mapper.text("}");
    }

    /// Emits `{ const [params] = __glintY__.blockParams["name"]; ... }`.
    fn emit_block_contents(
        &mut self,
        name: &str,
        name_span: Option<Span>,
        params: &[BlockParam],
        body: &[Statement],
    ) {
        self.mapper.newline();
        self.mapper.text("{");
        self.mapper.indent();
        self.mapper.newline();
        self.mapper.text("const [");
        for (index, param) in params.iter().enumerate() {
            if index > 0 {
                self.mapper.text(", ");
            }
            if !is_identifier_safe(&param.name) {
                self.mapper.error(
                    TransformErrorKind::Structural,
                    format!("Invalid block param name \"{}\"", param.name),
                    param.span,
                );
            }
            self.emit_local_identifier(&param.name, param.span);
        }
        self.mapper.text("] = __glintY__.blockParams[");
        match name_span {
            Some(span) => self.emit_quoted_identifier(name, span),
            None => self.mapper.text(&json_string(name)),
        }
        self.mapper.text("];");

        self.scope.push(params.iter().map(|param| param.name.clone()));
        self.emit_statements(body);
        self.scope.pop();

        self.mapper.dedent();
        self.mapper.newline();
        self.mapper.text("}");
    }

    // === Elements ===

    fn emit_element(&mut self, element: &ElementNode) {
        if element.is_named_block() {
            self.mapper.error(
                TransformErrorKind::Structural,
                "Named blocks are only valid as direct children of a component invocation",
                element.span,
            );
            self.for_node("ElementNode", element.span, |e| {
                e.mapper.text("{");
                e.mapper.indent();
                e.emit_statements(&element.children);
                e.mapper.dedent();
                e.mapper.newline();
                e.mapper.text("}");
            });
        } else if self.is_component(&element.tag) {
            self.emit_component(element);
        } else {
            self.emit_plain_element(element);
        }
    }

    fn is_component(&self, tag: &str) -> bool {
        let head = tag.split('.').next().unwrap_or(tag);
        tag.starts_with(|c: char| c.is_uppercase())
            || tag.contains('.')
            || tag.starts_with('@')
            || self.scope.has_binding(head)
    }

    fn emit_component(&mut self, element: &ElementNode) {
        self.for_node("ElementNode", element.span, |e| {
            e.mapper.text("{");
            e.mapper.indent();
            e.mapper.newline();
            e.mapper
                .text("const __glintY__ = __glintDSL__.emitComponent(__glintDSL__.resolve(");
            e.emit_tag_path(&element.tag, element.tag_span);
            e.mapper.text(")({ ");
            for arg in element.attributes.iter().filter(|attr| attr.is_argument()) {
                e.for_node("AttrNode", arg.span, |e| {
                    let name_span = Span::new(arg.name_span.start + TextSize::from(1), arg.name_span.end);
                    e.emit_object_key(&arg.name[1..], name_span);
                    e.mapper.text(": ");
                    e.emit_attr_value(&arg.value, true);
                });
                e.mapper.text(", ");
            }
            e.mapper.text("...__glintDSL__.NamedArgsMarker }));");

            let handle_used = e.emit_open_tag(element, false);
            let has_blocks = !element.children.is_empty() || !element.block_params.is_empty();
            if has_blocks {
                e.emit_component_blocks(element);
            } else if !handle_used {
                e.mapper.newline();
                e.mapper.text("__glintY__;");
            }

            if let Some(close_span) = element.close_tag_span {
                e.mapper.newline();
                e.emit_tag_path(&element.tag, close_span);
                e.mapper.text(";");
            }

            e.mapper.dedent();
            e.mapper.newline();
            e.mapper.text("}");
        });
    }

    fn emit_component_blocks(&mut self, element: &ElementNode) {
        let has_named_blocks = element
            .children
            .iter()
            .any(|child| matches!(child, Statement::Element(el) if el.is_named_block()));
        if !has_named_blocks {
            self.emit_block_contents("default", None, &element.block_params, &element.children);
            return;
        }

        for (index, child) in element.children.iter().enumerate() {
            match child {
                Statement::Element(named) if named.is_named_block() => {
                    self.for_node("ElementNode", named.span, |e| {
                        let name_span =
                            Span::new(named.tag_span.start + TextSize::from(1), named.tag_span.end);
                        e.emit_block_contents(
                            &named.tag[1..],
                            Some(name_span),
                            &named.block_params,
                            &named.children,
                        );
                    });
                }
                Statement::MustacheComment(comment) => {
                    self.emit_comment(comment, next_significant(&element.children[index + 1..]))
                }
                Statement::Comment(_) => {}
                other if other.is_whitespace_text() => {}
                other => self.mapper.error(
                    TransformErrorKind::Structural,
                    "Named blocks may not be mixed with other content",
                    other.span(),
                ),
            }
        }
    }

    fn emit_plain_element(&mut self, element: &ElementNode) {
        self.for_node("ElementNode", element.span, |e| {
            e.mapper.text("{");
            e.mapper.indent();
            e.mapper.newline();
            e.mapper.text("const __glintY__ = __glintDSL__.emitElement(");
            e.emit_quoted_identifier(&element.tag, element.tag_span);
            e.mapper.text(");");

            if !e.emit_open_tag(element, true) {
                e.mapper.newline();
                e.mapper.text("__glintY__;");
            }
            e.emit_statements(&element.children);

            e.mapper.dedent();
            e.mapper.newline();
            e.mapper.text("}");
        });
    }

    /// Emits splattributes, attributes and modifiers against `__glintY__`.
    /// Returns false if nothing was emitted.
    fn emit_open_tag(&mut self, element: &ElementNode, include_arguments: bool) -> bool {
        let parts = element.open_tag_parts();
        for (index, part) in parts.iter().enumerate() {
            if let OpenTagPart::Comment(comment) = part {
                let next = parts[index + 1..]
                    .iter()
                    .find(|part| !matches!(part, OpenTagPart::Comment(_)))
                    .map(OpenTagPart::span);
                self.emit_comment(comment, next);
            }
        }

        let mut emitted = false;

        for attr in element.attributes.iter().filter(|attr| attr.is_splattributes()) {
            if !attr.is_valueless() {
                self.mapper.error(
                    TransformErrorKind::Structural,
                    "...attributes cannot accept a value",
                    attr.span,
                );
            }
            self.mapper.newline();
            self.for_node("AttrNode", attr.span, |e| {
                e.mapper.text(
                    "__glintDSL__.applySplattributes(__glintRef__.element, __glintY__.element);",
                );
            });
            emitted = true;
        }

        let attributes: Vec<&AttrNode> = element
            .attributes
            .iter()
            .filter(|attr| !attr.is_splattributes() && (include_arguments || !attr.is_argument()))
            .collect();
        if !attributes.is_empty() {
            self.mapper.newline();
            self.mapper
                .text("__glintDSL__.applyAttributes(__glintY__.element, {");
            self.mapper.indent();
            for attr in attributes {
                self.mapper.newline();
                self.for_node("AttrNode", attr.span, |e| {
                    e.emit_object_key(&attr.name, attr.name_span);
                    e.mapper.text(": ");
                    e.emit_attr_value(&attr.value, false);
                });
                self.mapper.text(",");
            }
            self.mapper.dedent();
            self.mapper.newline();
            self.mapper.text("});");
            emitted = true;
        }

        for modifier in &element.modifiers {
            self.mapper.newline();
            self.emit_modifier(modifier);
            emitted = true;
        }

        emitted
    }

    fn emit_modifier(&mut self, modifier: &ElementModifierStatement) {
        if let Some(info) = self.special_form(&modifier.path) {
            self.mapper.error(
                TransformErrorKind::SemanticForm,
                format!("{} is not valid as a modifier", inline_form(&info.name)),
                modifier.span,
            );
            self.for_node("ElementModifierStatement", modifier.span, |e| {
                e.mapper.text("[");
                e.emit_args(&modifier.params, &modifier.hash);
                e.mapper.text("];");
            });
            return;
        }

        self.for_node("ElementModifierStatement", modifier.span, |e| {
            e.mapper
                .text("__glintDSL__.applyModifier(__glintDSL__.resolve(");
            e.emit_expression(&modifier.path);
            e.mapper.text(")(__glintY__.element");
            if modifier.has_arguments() {
                e.mapper.text(", ");
                e.emit_args(&modifier.params, &modifier.hash);
            }
            e.mapper.text("));");
        });
    }

    fn emit_attr_value(&mut self, value: &AttrValue, is_argument: bool) {
        match value {
            AttrValue::Text(text) => self.for_node("TextNode", text.span, |e| {
                e.mapper.text(&json_string(&text.chars));
            }),
            AttrValue::Mustache(mustache) => self.for_node("MustacheStatement", mustache.span, |e| {
                e.emit_mustache_value(mustache, is_argument);
            }),
            AttrValue::Concat(concat) => self.emit_concat(concat),
        }
    }

    fn emit_concat(&mut self, concat: &ConcatStatement) {
        self.for_node("ConcatStatement", concat.span, |e| {
            e.mapper.text("`");
            for part in &concat.parts {
                match part {
                    ConcatPart::Text(text) => e.mapper.text(&escape_template_literal(&text.chars)),
                    ConcatPart::Mustache(mustache) => {
                        e.mapper.text("${");
                        e.for_node("MustacheStatement", mustache.span, |e| {
                            e.emit_mustache_value(mustache, false);
                        });
                        e.mapper.text("}");
                    }
                }
            }
            e.mapper.text("`");
        });
    }

    /// Emits a tag name such as `Foo`, `this.foo`, `@foo.bar` or `ns.Item`
    /// as a path, mapping each segment.
    fn emit_tag_path(&mut self, tag: &str, span: Span) {
        self.for_node("PathExpression", span, |e| {
            let mut segments = Vec::new();
            let mut offset = span.start;
            for segment in tag.split('.') {
                let end = offset + TextSize::of(segment);
                segments.push((segment, Span::new(offset, end)));
                offset = end + TextSize::from(1);
            }

            let Some(((head, head_span), mut tail)) = segments.split_first() else {
                return;
            };
            if *head == "this" {
                e.mapper.text("__glintRef__.");
                e.mapper.identifier("this", "this", *head_span);
                if let Some(((segment, segment_span), rest)) = tail.split_first() {
                    e.emit_property(segment, *segment_span, false);
                    tail = rest;
                }
            } else if let Some(arg) = head.strip_prefix('@') {
                e.mapper.text("__glintRef__.args");
                let arg_span = Span::new(head_span.start + TextSize::from(1), head_span.end);
                e.emit_property(arg, arg_span, false);
            } else {
                e.emit_identifier_reference(head, *head_span);
            }
            for (segment, segment_span) in tail {
                e.emit_property(segment, *segment_span, true);
            }
        });
    }

    // === Expressions ===

    /// Emits the value of a mustache. Plain paths are emitted bare when
    /// `bare_when_plain` (argument position) and through `resolveOrReturn`
    /// otherwise.
    pub(crate) fn emit_mustache_value(&mut self, mustache: &MustacheStatement, bare_when_plain: bool) {
        if let Some(info) = self.special_form(&mustache.path) {
            self.emit_special_form_expression(mustache, &info);
        } else if mustache.has_arguments() {
            self.emit_resolve(mustache, "resolve");
        } else if bare_when_plain || !matches!(mustache.path, Expression::Path(_)) {
            self.emit_expression(&mustache.path);
        } else {
            self.mapper.text("__glintDSL__.resolveOrReturn(");
            self.emit_expression(&mustache.path);
            self.mapper.text(")()");
        }
    }

    /// Emits `__glintDSL__.<resolve_type>(callee)(args)`.
    pub(crate) fn emit_resolve<C: CallNode>(&mut self, call: &C, resolve_type: &str) {
        self.mapper.text("__glintDSL__.");
        self.mapper.text(resolve_type);
        self.mapper.text("(");
        self.emit_expression(call.callee());
        self.mapper.text(")(");
        self.emit_args(call.params(), call.hash());
        self.mapper.text(")");
    }

    pub(crate) fn emit_args(&mut self, params: &[Expression], hash: &Hash) {
        for (index, param) in params.iter().enumerate() {
            if index > 0 {
                self.mapper.text(", ");
            }
            self.emit_expression(param);
        }
        if !hash.is_empty() {
            if !params.is_empty() {
                self.mapper.text(", ");
            }
            self.emit_named_args(hash);
        }
    }

    fn emit_named_args(&mut self, hash: &Hash) {
        self.for_node("Hash", hash.span, |e| {
            e.mapper.text("{ ");
            for pair in &hash.pairs {
                e.for_node("HashPair", pair.span, |e| {
                    e.emit_object_key(&pair.key, pair.key_span);
                    e.mapper.text(": ");
                    e.emit_expression(&pair.value);
                });
                e.mapper.text(", ");
            }
            e.mapper.text("...__glintDSL__.NamedArgsMarker }");
        });
    }

    pub(crate) fn emit_object_key(&mut self, key: &str, span: Span) {
        if is_identifier_safe(key) {
            self.mapper.identifier(key, key, span);
        } else {
            self.emit_quoted_identifier(key, span);
        }
    }

    pub(crate) fn emit_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Path(path) => self.emit_path(path),
            Expression::Literal(literal) => self.emit_literal(literal),
            Expression::SubExpression(sexpr) => {
                self.for_node("SubExpression", sexpr.span, |e| {
                    match e.special_form(&sexpr.path) {
                        Some(info) => e.emit_special_form_expression(sexpr, &info),
                        None => e.emit_resolve(sexpr, "resolve"),
                    }
                });
            }
        }
    }

    fn emit_literal(&mut self, literal: &Literal) {
        self.for_node("Literal", literal.span, |e| {
            e.mapper.text(&literal_text(&literal.value));
        });
    }

    fn emit_path(&mut self, path: &PathExpression) {
        self.for_node("PathExpression", path.span, |e| {
            let mut tail = path.tail.iter();
            match &path.head {
                PathHead::This(span) => {
                    e.mapper.text("__glintRef__.");
                    e.mapper.identifier("this", "this", *span);
                    if let Some(segment) = tail.next() {
                        e.emit_property(&segment.name, segment.span, false);
                    }
                }
                PathHead::Arg(segment) => {
                    e.mapper.text("__glintRef__.args");
                    e.emit_property(&segment.name, segment.span, false);
                }
                PathHead::Var(segment) => e.emit_identifier_reference(&segment.name, segment.span),
            }
            for segment in tail {
                e.emit_property(&segment.name, segment.span, true);
            }
        });
    }

    /// Emits `.name`, `?.name` or `?.["na-me"]`.
    fn emit_property(&mut self, name: &str, span: Span, optional: bool) {
        if is_identifier_safe(name) {
            self.mapper.text(if optional { "?." } else { "." });
            self.mapper.identifier(name, name, span);
        } else {
            self.mapper.text(if optional { "?.[" } else { "[" });
            self.emit_quoted_identifier(name, span);
            self.mapper.text("]");
        }
    }

    /// Emits a free identifier: a block param verbatim, a global through
    /// `Globals`, anything else verbatim.
    fn emit_identifier_reference(&mut self, name: &str, span: Span) {
        let bound = self.scope.has_binding(name);
        if !is_identifier_safe(name) || (!bound && self.is_global(name)) {
            self.mapper.text("__glintDSL__.Globals[");
            self.emit_quoted_identifier(name, span);
            self.mapper.text("]");
        } else {
            self.emit_local_identifier(name, span);
        }
    }

    /// Emits `"name"`, mapping only the characters of `name` so offsets
    /// inside it translate one to one.
    fn emit_quoted_identifier(&mut self, name: &str, span: Span) {
        let quoted = json_string(name);
        let unescaped = quoted
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .is_some_and(|inner| inner == name);
        if unescaped {
            self.mapper.text("\"");
            self.mapper.identifier(name, name, span);
            self.mapper.text("\"");
        } else {
            self.mapper.identifier(&quoted, name, span);
        }
    }

    /// Emits a template-local binding. A `__` prefix added for reserved or
    /// unsafe names stays outside the mapped identifier.
    fn emit_local_identifier(&mut self, name: &str, span: Span) {
        let local = local_name(name);
        match local.strip_prefix("__") {
            Some(rest) if local != name => {
                self.mapper.text("__");
                self.mapper.identifier(rest, name, span);
            }
            _ => self.mapper.identifier(&local, name, span),
        }
    }
}

/// The span of the first node after a directive comment that it can apply to.
fn next_significant(statements: &[Statement]) -> Option<Span> {
    statements
        .iter()
        .find(|statement| {
            !statement.is_whitespace_text()
                && !matches!(
                    statement,
                    Statement::Comment(_) | Statement::MustacheComment(_)
                )
        })
        .map(Statement::span)
}

/// `{{name}}`, as used in special-form error messages.
pub(crate) fn inline_form(name: &str) -> String {
    format!("{{{{{name}}}}}")
}

/// `{{#name}}`, as used in special-form error messages.
pub(crate) fn block_form(name: &str) -> String {
    format!("{{{{#{name}}}}}")
}

const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// True for names usable as a bare JavaScript identifier or property name.
pub(crate) fn is_identifier_safe(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// The name a template-local binding gets in generated code.
fn local_name(name: &str) -> String {
    if RESERVED_WORDS.contains(&name) {
        format!("__{name}")
    } else if is_identifier_safe(name) {
        name.to_string()
    } else {
        let sanitized: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
            .collect();
        format!("__{sanitized}")
    }
}

pub(crate) fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn escape_template_literal(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

fn literal_text(value: &LiteralValue) -> String {
    match value {
        LiteralValue::String(value) => json_string(value),
        LiteralValue::Number(value) => {
            if value.fract() == 0.0 && value.abs() < 1e15 {
                format!("{}", *value as i64)
            } else {
                value.to_string()
            }
        }
        LiteralValue::Boolean(value) => value.to_string(),
        LiteralValue::Null => "null".to_string(),
        LiteralValue::Undefined => "undefined".to_string(),
    }
}
