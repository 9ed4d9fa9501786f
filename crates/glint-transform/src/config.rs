//! Environment configuration.
//!
//! A [`GlintEnvironment`] describes which embeddings a module may contain and
//! how each one is compiled: the types module its boilerplate imports, the
//! special forms it expands and the globals it resolves through
//! `__glintDSL__.Globals`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::ConfigError;

/// A call-like construct that expands to a control construct or operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialForm {
    #[serde(rename = "if")]
    If,
    #[serde(rename = "if-not")]
    IfNot,
    #[serde(rename = "yield")]
    Yield,
    #[serde(rename = "object-literal")]
    ObjectLiteral,
    #[serde(rename = "array-literal")]
    ArrayLiteral,
    #[serde(rename = "bind-invokable")]
    BindInvokable,
    #[serde(rename = "===")]
    StrictEquals,
    #[serde(rename = "!==")]
    StrictNotEquals,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
    #[serde(rename = "!")]
    Not,
}

impl SpecialForm {
    /// The configuration name of this form.
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialForm::If => "if",
            SpecialForm::IfNot => "if-not",
            SpecialForm::Yield => "yield",
            SpecialForm::ObjectLiteral => "object-literal",
            SpecialForm::ArrayLiteral => "array-literal",
            SpecialForm::BindInvokable => "bind-invokable",
            SpecialForm::StrictEquals => "===",
            SpecialForm::StrictNotEquals => "!==",
            SpecialForm::And => "&&",
            SpecialForm::Or => "||",
            SpecialForm::Not => "!",
        }
    }
}

/// Bare name → form.
pub type SpecialForms = IndexMap<SmolStr, SpecialForm>;

/// How one kind of embedding is compiled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    /// Module whose DSL the generated code imports.
    pub types_module: String,
    #[serde(default)]
    pub special_forms: SpecialForms,
    /// Names resolved through `Globals`. `None` means every unbound name is
    /// a global.
    #[serde(default)]
    pub globals: Option<Vec<SmolStr>>,
    /// Import source → exported name → form, for special forms that must be
    /// imported before use.
    #[serde(default)]
    pub special_form_imports: IndexMap<String, IndexMap<SmolStr, SpecialForm>>,
}

/// Rules for templates that live in their own file next to a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanionConfig {
    #[serde(flatten)]
    pub template: TemplateConfig,
    #[serde(default = "default_template_extension")]
    pub template_extension: String,
    /// Script extensions in lookup priority order.
    #[serde(default = "default_script_extensions")]
    pub script_extensions: Vec<String>,
    /// Whether `component.ts` / `template.hbs` pod pairs are recognized.
    #[serde(default = "default_true")]
    pub pod_layout: bool,
    /// Root of classic-layout templates, e.g. `app/templates`.
    #[serde(default)]
    pub classic_templates_dir: Option<String>,
}

fn default_template_extension() -> String {
    ".hbs".to_string()
}

fn default_script_extensions() -> Vec<String> {
    [".ts", ".gts", ".js", ".gjs"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_true() -> bool {
    true
}

/// The complete environment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlintEnvironment {
    /// Import source → tag name → config for tagged template literals.
    #[serde(default)]
    pub tags: IndexMap<String, IndexMap<SmolStr, TemplateConfig>>,
    /// Native `<template>` embeddings; `None` disables them.
    #[serde(default)]
    pub native_template: Option<TemplateConfig>,
    /// Companion template files; `None` disables them.
    #[serde(default)]
    pub companion: Option<CompanionConfig>,
}

impl GlintEnvironment {
    /// Parses an environment from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Looks up the config for a tag imported as `name` from `source`.
    pub fn tag_config(&self, source: &str, name: &str) -> Option<&TemplateConfig> {
        self.tags.get(source)?.get(name)
    }

    /// Import sources that provide template tags.
    pub fn tag_sources(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }
}

const LOOSE_TYPES_MODULE: &str = "@glint/environment-ember-loose/-private/dsl";
const TEMPLATE_IMPORTS_TYPES_MODULE: &str = "@glint/environment-ember-template-imports/-private/dsl";

const EMBER_GLOBALS: &[&str] = &[
    "action",
    "component",
    "debugger",
    "each",
    "each-in",
    "has-block",
    "has-block-params",
    "helper",
    "if",
    "in-element",
    "let",
    "log",
    "modifier",
    "mount",
    "mut",
    "outlet",
    "unbound",
    "unless",
    "with",
    "yield",
];

fn ember_special_forms() -> SpecialForms {
    [
        ("if", SpecialForm::If),
        ("unless", SpecialForm::IfNot),
        ("yield", SpecialForm::Yield),
        ("component", SpecialForm::BindInvokable),
        ("helper", SpecialForm::BindInvokable),
        ("modifier", SpecialForm::BindInvokable),
    ]
    .into_iter()
    .map(|(name, form)| (SmolStr::new(name), form))
    .collect()
}

fn ember_globals() -> Option<Vec<SmolStr>> {
    Some(EMBER_GLOBALS.iter().map(|name| SmolStr::new(name)).collect())
}

impl Default for GlintEnvironment {
    /// Ember defaults: `hbs` from `ember-cli-htmlbars`, native `<template>`
    /// and colocated/pod/classic companion templates.
    fn default() -> Self {
        let loose = TemplateConfig {
            types_module: LOOSE_TYPES_MODULE.to_string(),
            special_forms: ember_special_forms(),
            globals: ember_globals(),
            special_form_imports: IndexMap::new(),
        };

        let mut helper_forms = IndexMap::new();
        helper_forms.insert(SmolStr::new("array"), SpecialForm::ArrayLiteral);
        helper_forms.insert(SmolStr::new("hash"), SpecialForm::ObjectLiteral);
        let mut special_form_imports = IndexMap::new();
        special_form_imports.insert("@ember/helper".to_string(), helper_forms);

        let native = TemplateConfig {
            types_module: TEMPLATE_IMPORTS_TYPES_MODULE.to_string(),
            special_forms: ember_special_forms(),
            globals: ember_globals(),
            special_form_imports,
        };

        let mut hbs = IndexMap::new();
        hbs.insert(SmolStr::new("hbs"), loose.clone());
        let mut tags = IndexMap::new();
        tags.insert("ember-cli-htmlbars".to_string(), hbs);

        Self {
            tags,
            native_template: Some(native),
            companion: Some(CompanionConfig {
                template: loose,
                template_extension: default_template_extension(),
                script_extensions: default_script_extensions(),
                pod_layout: true,
                classic_templates_dir: Some("app/templates".to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_json() {
        let env = GlintEnvironment::from_json(
            r#"{
                "tags": {
                    "ember-cli-htmlbars": {
                        "hbs": {
                            "typesModule": "@glint/test",
                            "specialForms": { "testIf": "if", "testEq": "===" },
                            "globals": ["testIf"]
                        }
                    }
                },
                "companion": {
                    "typesModule": "@glint/test",
                    "templateExtension": ".hbs"
                }
            }"#,
        )
        .unwrap();

        let hbs = env.tag_config("ember-cli-htmlbars", "hbs").unwrap();
        assert_eq!(hbs.types_module, "@glint/test");
        assert_eq!(hbs.special_forms.get("testEq"), Some(&SpecialForm::StrictEquals));
        assert_eq!(hbs.globals.as_deref(), Some(&[SmolStr::new("testIf")][..]));
        assert!(env.native_template.is_none());

        let companion = env.companion.unwrap();
        assert_eq!(companion.template.types_module, "@glint/test");
        assert_eq!(companion.script_extensions, vec![".ts", ".gts", ".js", ".gjs"]);
        assert!(companion.pod_layout);
    }

    #[test]
    fn test_invalid_form_is_rejected() {
        let err = GlintEnvironment::from_json(
            r#"{ "nativeTemplate": { "typesModule": "x", "specialForms": { "a": "unless" } } }"#,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("invalid environment configuration"));
    }

    #[test]
    fn test_form_names_round_trip() {
        for form in [
            SpecialForm::If,
            SpecialForm::IfNot,
            SpecialForm::Yield,
            SpecialForm::ObjectLiteral,
            SpecialForm::ArrayLiteral,
            SpecialForm::BindInvokable,
            SpecialForm::StrictEquals,
            SpecialForm::StrictNotEquals,
            SpecialForm::And,
            SpecialForm::Or,
            SpecialForm::Not,
        ] {
            let json = serde_json::to_string(&form).unwrap();
            assert_eq!(json, format!("\"{}\"", form.as_str()));
        }
    }

    #[test]
    fn test_default_environment() {
        let env = GlintEnvironment::default();
        assert_eq!(env.tag_sources().collect::<Vec<_>>(), vec!["ember-cli-htmlbars"]);
        let native = env.native_template.as_ref().unwrap();
        assert_eq!(
            native.special_form_imports["@ember/helper"].get("hash"),
            Some(&SpecialForm::ObjectLiteral)
        );
    }

    #[test]
    fn test_environment_serializes_with_name_keys() {
        let env = GlintEnvironment::default();
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(
            json["nativeTemplate"]["specialFormImports"]["@ember/helper"]["hash"],
            "object-literal"
        );
        let reloaded = GlintEnvironment::from_json(&json.to_string()).unwrap();
        assert_eq!(reloaded, env);
    }
}
