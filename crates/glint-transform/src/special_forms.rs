//! Special forms: configured call names that expand to control constructs or
//! operators instead of `resolve` invocations.

use glimmer_parser::{BlockStatement, CallNode, Expression, Hash, LiteralValue, MustacheStatement};
use smol_str::SmolStr;
use source_map::Span;

use crate::config::{SpecialForm, SpecialForms};
use crate::error::TransformErrorKind;
use crate::scope::ScopeTracker;
use crate::template::{block_form, inline_form, json_string, Emitter};

/// A call site that resolved to a special form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialFormInfo {
    pub name: SmolStr,
    pub form: SpecialForm,
    /// The name is not a global, so it must be an import; the emitted code
    /// references it so the import is not reported as unused.
    pub requires_consumption: bool,
}

/// Classifies the callee of a call.
///
/// Only an undotted free identifier can be a special form, and only while no
/// enclosing block param shadows it.
pub fn classify_special_form(
    callee: &Expression,
    forms: &SpecialForms,
    globals: Option<&[SmolStr]>,
    scope: &ScopeTracker,
) -> Option<SpecialFormInfo> {
    let name = callee.as_path()?.as_simple_var()?;
    let form = *forms.get(name)?;
    if scope.has_binding(name) {
        return None;
    }
    Some(SpecialFormInfo {
        name: SmolStr::new(name),
        form,
        requires_consumption: globals.is_some_and(|globals| !globals.iter().any(|g| g == name)),
    })
}

impl Emitter<'_> {
    /// Expands a special form in value position.
    pub(crate) fn emit_special_form_expression<C: CallNode>(
        &mut self,
        call: &C,
        info: &SpecialFormInfo,
    ) {
        if info.requires_consumption {
            self.mapper.text("(__glintDSL__.noop(");
            self.emit_expression(call.callee());
            self.mapper.text("), ");
            self.emit_special_form_value(call, info);
            self.mapper.text(")");
        } else {
            self.emit_special_form_value(call, info);
        }
    }

    fn emit_special_form_value<C: CallNode>(&mut self, call: &C, info: &SpecialFormInfo) {
        let name = inline_form(&info.name);
        let params = call.params();
        let hash = call.hash();

        match info.form {
            SpecialForm::If | SpecialForm::IfNot => {
                if params.len() < 2 {
                    return self.form_error(call, format!("{name} requires at least two parameters"));
                }
                self.mapper.text("(");
                if info.form == SpecialForm::IfNot {
                    self.mapper.text("!");
                }
                self.mapper.text("(");
                self.emit_expression(&params[0]);
                self.mapper.text(") ? (");
                self.emit_expression(&params[1]);
                self.mapper.text(") : (");
                match params.get(2) {
                    Some(alternate) => self.emit_expression(alternate),
                    None => self.mapper.text("undefined"),
                }
                self.mapper.text("))");
            }
            SpecialForm::Yield => {
                self.form_error(call, format!("{name} may only appear as a top-level statement"));
            }
            SpecialForm::ObjectLiteral => {
                if !params.is_empty() {
                    return self.form_error(call, format!("{name} only accepts named parameters"));
                }
                if hash.is_empty() {
                    self.mapper.text("{}");
                } else {
                    self.mapper.text("(");
                    self.emit_object_literal(hash);
                    self.mapper.text(")");
                }
            }
            SpecialForm::ArrayLiteral => {
                if !hash.is_empty() {
                    return self.form_error(call, format!("{name} only accepts positional parameters"));
                }
                self.mapper.text("[");
                self.emit_separated(params, ", ");
                self.mapper.text("]");
            }
            SpecialForm::BindInvokable => {
                if params.is_empty() {
                    return self.form_error(
                        call,
                        format!("{name} requires at least one positional argument"),
                    );
                }
                if params.len() > 1 && !hash.is_empty() {
                    return self.form_error(
                        call,
                        format!(
                            "{name} can only pre-bind either named or positional arguments in a single pass"
                        ),
                    );
                }
                self.emit_resolve(call, "resolve");
            }
            SpecialForm::StrictEquals | SpecialForm::StrictNotEquals => {
                if !hash.is_empty() {
                    return self.form_error(call, format!("{name} only accepts positional parameters"));
                }
                if params.len() != 2 {
                    return self.form_error(call, format!("{name} requires exactly two parameters"));
                }
                let operator = if info.form == SpecialForm::StrictEquals {
                    " === "
                } else {
                    " !== "
                };
                self.mapper.text("(");
                self.emit_separated(params, operator);
                self.mapper.text(")");
            }
            SpecialForm::And | SpecialForm::Or => {
                if !hash.is_empty() {
                    return self.form_error(call, format!("{name} only accepts positional parameters"));
                }
                if params.len() < 2 {
                    return self.form_error(call, format!("{name} requires at least two parameters"));
                }
                let operator = if info.form == SpecialForm::And { " && " } else { " || " };
                self.mapper.text("(");
                self.emit_separated(params, operator);
                self.mapper.text(")");
            }
            SpecialForm::Not => {
                if !hash.is_empty() {
                    return self.form_error(call, format!("{name} only accepts positional parameters"));
                }
                if params.len() != 1 {
                    return self.form_error(call, format!("{name} requires exactly one parameter"));
                }
                self.mapper.text("!(");
                self.emit_expression(&params[0]);
                self.mapper.text(")");
            }
        }
    }

    /// Records a form error at the whole call and emits a placeholder value.
    fn form_error<C: CallNode>(&mut self, call: &C, message: String) {
        self.mapper
            .error(TransformErrorKind::SemanticForm, message, call.span());
        self.mapper.text("undefined");
    }

    fn emit_separated(&mut self, expressions: &[Expression], separator: &str) {
        for (index, expression) in expressions.iter().enumerate() {
            if index > 0 {
                self.mapper.text(separator);
            }
            self.emit_expression(expression);
        }
    }

    fn emit_object_literal(&mut self, hash: &Hash) {
        self.for_node("Hash", hash.span, |e| {
            e.mapper.text("{ ");
            for (index, pair) in hash.pairs.iter().enumerate() {
                if index > 0 {
                    e.mapper.text(", ");
                }
                e.for_node("HashPair", pair.span, |e| {
                    e.emit_object_key(&pair.key, pair.key_span);
                    e.mapper.text(": ");
                    e.emit_expression(&pair.value);
                });
            }
            e.mapper.text(" }");
        });
    }

    fn emit_consumption(&mut self, callee: &Expression, info: &SpecialFormInfo) {
        if info.requires_consumption {
            self.mapper.text("__glintDSL__.noop(");
            self.emit_expression(callee);
            self.mapper.text(");");
            self.mapper.newline();
        }
    }

    /// Emits `{{#if}}` / `{{#unless}}` as an `if` statement.
    pub(crate) fn emit_if_block(&mut self, block: &BlockStatement, info: &SpecialFormInfo) {
        self.for_node("BlockStatement", block.span, |e| {
            e.emit_consumption(&block.path, info);

            e.mapper.text("if (");
            if info.form == SpecialForm::IfNot {
                e.mapper.text("!");
            }
            e.mapper.text("(");
            match block.params.as_slice() {
                [condition] if block.hash.is_empty() => e.emit_expression(condition),
                _ => {
                    e.mapper.error(
                        TransformErrorKind::SemanticForm,
                        format!("{} requires exactly one condition", block_form(&info.name)),
                        block.span,
                    );
                    e.mapper.text("undefined");
                }
            }
            e.mapper.text(")) {");

            e.mapper.indent();
            e.scope.push(
                block
                    .program
                    .block_params
                    .iter()
                    .map(|param| param.name.clone()),
            );
            e.emit_statements(&block.program.body);
            e.scope.pop();
            e.mapper.dedent();
            e.mapper.newline();
            e.mapper.text("}");

            if let Some(inverse) = &block.inverse {
                e.mapper.text(" else {");
                e.mapper.indent();
                e.emit_statements(&inverse.body);
                e.mapper.dedent();
                e.mapper.newline();
                e.mapper.text("}");
            }
        });
    }

    /// Emits `{{yield}}` as a call to the target block.
    pub(crate) fn emit_yield(&mut self, mustache: &MustacheStatement, info: &SpecialFormInfo) {
        self.for_node("MustacheStatement", mustache.span, |e| {
            e.emit_consumption(&mustache.path, info);

            e.mapper.text("__glintDSL__.yieldToBlock(__glintRef__, ");
            match mustache.hash.pairs.iter().find(|pair| pair.key == "to") {
                None => e.mapper.text("\"default\""),
                Some(pair) => match &pair.value {
                    Expression::Literal(literal) => match &literal.value {
                        LiteralValue::String(to) => {
                            let to = if to == "inverse" { "else" } else { to.as_str() };
                            e.for_node("Literal", literal.span, |e| {
                                e.mapper.text(&json_string(to));
                            });
                        }
                        _ => e.non_literal_block_name(info, literal.span),
                    },
                    other => e.non_literal_block_name(info, other.span()),
                },
            }
            e.mapper.text(")(");
            e.emit_separated(&mustache.params, ", ");
            e.mapper.text(");");
        });
    }

    fn non_literal_block_name(&mut self, info: &SpecialFormInfo, span: Span) {
        self.mapper.error(
            TransformErrorKind::SemanticForm,
            format!(
                "Named block {}s must have a literal block name",
                inline_form(&info.name)
            ),
            span,
        );
        self.mapper.text("\"default\"");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{template_to_typescript, CompiledTemplate, TemplateOptions};
    use camino::Utf8Path;
    use pretty_assertions::assert_eq;

    fn forms(entries: &[(&str, SpecialForm)]) -> SpecialForms {
        entries
            .iter()
            .map(|(name, form)| (SmolStr::new(name), *form))
            .collect()
    }

    fn compile(template: &str, forms: &SpecialForms, globals: Option<&[SmolStr]>) -> CompiledTemplate {
        let options = TemplateOptions {
            file: Utf8Path::new("test.hbs"),
            types_module: "@glint/test",
            backing_value: None,
            prepend: "",
            append: "",
            preamble: &[],
            special_forms: forms,
            globals,
        };
        template_to_typescript(template, Span::from_usize(0, template.len()), &options)
    }

    fn body(compiled: &CompiledTemplate) -> String {
        let lines: Vec<&str> = compiled.code.lines().collect();
        lines[1..lines.len() - 2]
            .iter()
            .map(|line| line.strip_prefix("  ").unwrap_or(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn messages(compiled: &CompiledTemplate) -> Vec<&str> {
        compiled.errors.iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn test_classification() {
        let forms = forms(&[("testIf", SpecialForm::If)]);
        let mut scope = ScopeTracker::new();
        let template = glimmer_parser::parse("{{testIf}}{{this.testIf}}{{@testIf}}{{testIf.x}}").unwrap();
        let callees: Vec<&Expression> = template
            .body
            .iter()
            .map(|statement| match statement {
                glimmer_parser::Statement::Mustache(m) => &m.path,
                _ => unreachable!(),
            })
            .collect();

        let info = classify_special_form(callees[0], &forms, None, &scope).unwrap();
        assert_eq!(info.form, SpecialForm::If);
        assert!(!info.requires_consumption);
        for callee in &callees[1..] {
            assert_eq!(classify_special_form(callee, &forms, None, &scope), None);
        }

        let globals = [SmolStr::new("other")];
        let info = classify_special_form(callees[0], &forms, Some(&globals), &scope).unwrap();
        assert!(info.requires_consumption);

        scope.push(["testIf"]);
        assert_eq!(classify_special_form(callees[0], &forms, None, &scope), None);
    }

    #[test]
    fn test_classification_is_stable_across_scopes() {
        let forms = forms(&[("testEq", SpecialForm::StrictEquals)]);
        let globals = [SmolStr::new("testEq")];
        let template = glimmer_parser::parse("{{testEq 1 2}}").unwrap();
        let glimmer_parser::Statement::Mustache(mustache) = &template.body[0] else {
            unreachable!()
        };
        let mut scope = ScopeTracker::new();

        let first = classify_special_form(&mustache.path, &forms, Some(&globals), &scope);
        assert_eq!(classify_special_form(&mustache.path, &forms, Some(&globals), &scope), first);

        scope.push(["other"]);
        assert_eq!(classify_special_form(&mustache.path, &forms, Some(&globals), &scope), first);
        scope.push(["testEq"]);
        assert_eq!(classify_special_form(&mustache.path, &forms, Some(&globals), &scope), None);
        scope.pop();
        scope.pop();
        assert_eq!(classify_special_form(&mustache.path, &forms, Some(&globals), &scope), first);

        let source = "{{testEq @a 1}}{{#each @items as |testEq|}}{{testEq 1}}{{/each}}{{testEq @b 2}}";
        let once = compile(source, &forms, Some(&globals));
        let twice = compile(source, &forms, Some(&globals));
        assert_eq!(once.code, twice.code);
        assert!(once.code.contains("(__glintRef__.args.a === 1)"));
        assert!(once.code.contains("(__glintRef__.args.b === 2)"));
        assert!(once.code.contains("__glintDSL__.resolve(testEq)(1)"));
    }

    #[test]
    fn test_inline_if() {
        let forms = forms(&[("testIf", SpecialForm::If)]);
        let compiled = compile("{{testIf @cond \"yes\" \"no\"}}", &forms, None);
        assert_eq!(
            body(&compiled),
            "__glintDSL__.emitContent(((__glintRef__.args.cond) ? (\"yes\") : (\"no\")));"
        );
        assert!(compiled.errors.is_empty());
    }

    #[test]
    fn test_inline_unless_without_alternate() {
        let forms = forms(&[("testUnless", SpecialForm::IfNot)]);
        let compiled = compile("<div class={{testUnless @a \"b\"}}></div>", &forms, None);
        assert!(compiled
            .code
            .contains("class: (!(__glintRef__.args.a) ? (\"b\") : (undefined)),"));
    }

    #[test]
    fn test_strict_equals_arity() {
        let forms = forms(&[("testEq", SpecialForm::StrictEquals)]);
        let source = "{{testEq 1 2 3}}";
        let compiled = compile(source, &forms, None);
        assert_eq!(messages(&compiled), vec!["{{testEq}} requires exactly two parameters"]);
        assert_eq!(compiled.errors[0].location, Span::from_usize(0, source.len()));
        assert_eq!(compiled.errors[0].kind, TransformErrorKind::SemanticForm);
        assert!(compiled.code.contains("__glintDSL__.emitContent(undefined);"));
    }

    #[test]
    fn test_operators() {
        let forms = forms(&[
            ("eq", SpecialForm::StrictEquals),
            ("neq", SpecialForm::StrictNotEquals),
            ("and", SpecialForm::And),
            ("or", SpecialForm::Or),
            ("not", SpecialForm::Not),
        ]);
        let compiled = compile(
            "{{and (eq @a 1) (neq @b 2) (or @c @d @e) (not @f)}}",
            &forms,
            None,
        );
        assert_eq!(
            body(&compiled),
            "__glintDSL__.emitContent(((__glintRef__.args.a === 1) && (__glintRef__.args.b !== 2) && (__glintRef__.args.c || __glintRef__.args.d || __glintRef__.args.e) && !(__glintRef__.args.f)));"
        );
    }

    #[test]
    fn test_operator_errors() {
        let forms = forms(&[("and", SpecialForm::And), ("not", SpecialForm::Not)]);
        let compiled = compile("{{and @a}}{{not @a @b}}{{and @a @b x=1}}", &forms, None);
        assert_eq!(
            messages(&compiled),
            vec![
                "{{and}} requires at least two parameters",
                "{{not}} requires exactly one parameter",
                "{{and}} only accepts positional parameters",
            ]
        );
    }

    #[test]
    fn test_literals() {
        let forms = forms(&[
            ("hash", SpecialForm::ObjectLiteral),
            ("array", SpecialForm::ArrayLiteral),
        ]);
        let compiled = compile(
            "<Foo @opts={{hash a=1 b-c=@d}} @empty={{hash}} @list={{array 1 \"two\"}} />",
            &forms,
            None,
        );
        assert!(compiled.errors.is_empty());
        assert!(compiled.code.contains(
            "({ opts: ({ a: 1, \"b-c\": __glintRef__.args.d }), empty: {}, list: [1, \"two\"], ...__glintDSL__.NamedArgsMarker })"
        ));

        let compiled = compile("{{hash 1}}{{array a=1}}", &forms, None);
        assert_eq!(
            messages(&compiled),
            vec![
                "{{hash}} only accepts named parameters",
                "{{array}} only accepts positional parameters",
            ]
        );
    }

    #[test]
    fn test_bind_invokable() {
        let forms = forms(&[("component", SpecialForm::BindInvokable)]);
        let compiled = compile("{{component \"x\" a=1}}", &forms, None);
        assert_eq!(
            body(&compiled),
            "__glintDSL__.emitContent(__glintDSL__.resolve(__glintDSL__.Globals[\"component\"])(\"x\", { a: 1, ...__glintDSL__.NamedArgsMarker }));"
        );

        let compiled = compile("{{component}}{{component @a @b c=1}}", &forms, None);
        assert_eq!(
            messages(&compiled),
            vec![
                "{{component}} requires at least one positional argument",
                "{{component}} can only pre-bind either named or positional arguments in a single pass",
            ]
        );
    }

    #[test]
    fn test_if_block_with_chained_else() {
        let forms = forms(&[("if", SpecialForm::If), ("unless", SpecialForm::IfNot)]);
        let compiled = compile(
            "{{#if @a}}{{@x}}{{else unless @b}}{{@y}}{{else}}{{@z}}{{/if}}",
            &forms,
            None,
        );
        assert!(compiled.errors.is_empty());
        assert_eq!(
            body(&compiled),
            [
                "if ((__glintRef__.args.a)) {",
                "  __glintDSL__.emitContent(__glintDSL__.resolveOrReturn(__glintRef__.args.x)());",
                "} else {",
                "  if (!(__glintRef__.args.b)) {",
                "    __glintDSL__.emitContent(__glintDSL__.resolveOrReturn(__glintRef__.args.y)());",
                "  } else {",
                "    __glintDSL__.emitContent(__glintDSL__.resolveOrReturn(__glintRef__.args.z)());",
                "  }",
                "}",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_if_block_arity() {
        let forms = forms(&[("if", SpecialForm::If)]);
        let compiled = compile("{{#if @a @b}}x{{/if}}", &forms, None);
        assert_eq!(messages(&compiled), vec!["{{#if}} requires exactly one condition"]);
        assert!(compiled.code.contains("if ((undefined)) {"));
    }

    #[test]
    fn test_forms_in_wrong_position() {
        let forms = forms(&[("yield", SpecialForm::Yield), ("eq", SpecialForm::StrictEquals)]);
        let compiled = compile(
            "{{#eq 1 2}}{{/eq}}<div {{eq 1 2}}></div>{{concat (yield)}}",
            &forms,
            None,
        );
        assert_eq!(
            messages(&compiled),
            vec![
                "{{#eq}} is not valid as a block",
                "{{eq}} is not valid as a modifier",
                "{{yield}} may only appear as a top-level statement",
            ]
        );
    }

    #[test]
    fn test_misplaced_block_form_still_checks_its_body() {
        let forms = forms(&[("eq", SpecialForm::StrictEquals)]);
        let compiled = compile(
            "{{#eq @a 2 as |item|}}{{! @glint-bogus }}{{item.name}}{{else}}{{@inner}}{{/eq}}",
            &forms,
            None,
        );
        assert_eq!(
            messages(&compiled),
            vec!["{{#eq}} is not valid as a block", "Unknown directive @glint-bogus"]
        );
        assert!(compiled.code.contains("[__glintRef__.args.a, 2];"));
        assert!(compiled.code.contains("const [item] = [] as any[];"));
        assert!(compiled.code.contains("item?.name"));
        assert!(compiled.code.contains("__glintRef__.args.inner"));
    }

    #[test]
    fn test_misplaced_modifier_form_still_checks_its_arguments() {
        let forms = forms(&[("eq", SpecialForm::StrictEquals)]);
        let compiled = compile("<div {{eq @left (concat @right)}}></div>", &forms, None);
        assert_eq!(messages(&compiled), vec!["{{eq}} is not valid as a modifier"]);
        assert!(compiled.code.contains("__glintRef__.args.left"));
        assert!(compiled.code.contains("__glintRef__.args.right"));
        assert!(!compiled.code.contains("applyModifier"));
    }

    #[test]
    fn test_yield() {
        let forms = forms(&[("yield", SpecialForm::Yield)]);
        let compiled = compile(
            "{{yield @a 1}}{{yield to=\"inverse\"}}{{yield to=@name}}",
            &forms,
            None,
        );
        assert_eq!(
            body(&compiled),
            [
                "__glintDSL__.yieldToBlock(__glintRef__, \"default\")(__glintRef__.args.a, 1);",
                "__glintDSL__.yieldToBlock(__glintRef__, \"else\")();",
                "__glintDSL__.yieldToBlock(__glintRef__, \"default\")();",
            ]
            .join("\n")
        );
        assert_eq!(
            messages(&compiled),
            vec!["Named block {{yield}}s must have a literal block name"]
        );
    }

    #[test]
    fn test_consumption_of_imported_forms() {
        let forms = forms(&[("hash", SpecialForm::ObjectLiteral), ("myIf", SpecialForm::If)]);
        let globals = [SmolStr::new("each")];
        let compiled = compile(
            "{{#myIf @a}}{{/myIf}}<Foo @h={{hash}} />",
            &forms,
            Some(&globals),
        );
        assert_eq!(
            body(&compiled),
            [
                "__glintDSL__.noop(myIf);",
                "if ((__glintRef__.args.a)) {",
                "}",
                "{",
                "  const __glintY__ = __glintDSL__.emitComponent(__glintDSL__.resolve(Foo)({ h: (__glintDSL__.noop(hash), {}), ...__glintDSL__.NamedArgsMarker }));",
                "  __glintY__;",
                "}",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_shadowed_form_is_a_plain_call() {
        let forms = forms(&[("eq", SpecialForm::StrictEquals)]);
        let compiled = compile("{{#let @f as |eq|}}{{eq 1}}{{/let}}", &forms, None);
        assert!(compiled.errors.is_empty());
        assert!(compiled.code.contains("__glintDSL__.resolve(eq)(1)"));
    }
}
