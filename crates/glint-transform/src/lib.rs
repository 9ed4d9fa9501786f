//! Glimmer template to TypeScript transformation.
//!
//! This crate rewrites script modules that embed Glimmer templates into plain
//! TypeScript that a type checker can analyze. It handles:
//! - Tagged template literals (`` hbs`...` ``) imported from configured sources
//! - Native `<template>` tags in `.gts`/`.gjs` files
//! - Companion template files paired with a script by path convention
//! - Special forms (`if`, `yield`, `hash`, `===`, ...) expanded to TypeScript
//! - `@glint-*` directives for suppressing diagnostics
//!
//! Every rewritten module is a [`TransformedModule`] that translates offsets
//! in both directions between the original files and the generated code.
//!
//! # Example
//!
//! ```
//! use glint_transform::{rewrite_module, GlintEnvironment, SourceFile};
//!
//! let script = SourceFile::new(
//!     "app/components/greeting.gts",
//!     "export default <template>Hello, {{@name}}!</template>\n",
//! );
//! let module = rewrite_module(&script, None, &GlintEnvironment::default())
//!     .unwrap()
//!     .unwrap();
//! assert!(module.transformed_contents().contains("__glintRef__.args.name"));
//! ```

mod companion;
mod config;
mod directives;
mod embeddings;
mod error;
mod mapper;
mod module;
mod prefilter;
mod scope;
mod special_forms;
mod template;
mod transformed_module;

pub use companion::{
    find_companion_script, find_companion_template, script_candidates, template_candidates,
    Candidate, FileSystem, MemoryFileSystem,
};
pub use config::{CompanionConfig, GlintEnvironment, SpecialForm, SpecialForms, TemplateConfig};
pub use directives::{recognize, Directive, DirectiveKind, Recognized};
pub use embeddings::{scan_native_templates, NativeEmbedding, NativeScan, Placement, UnclosedTemplate};
pub use error::{ConfigError, RewriteError, TransformError, TransformErrorKind};
pub use module::{rewrite_module, transform_path, SourceFile};
pub use prefilter::EmbeddingPrefilter;
pub use scope::ScopeTracker;
pub use special_forms::{classify_special_form, SpecialFormInfo};
pub use template::{template_to_typescript, CompiledTemplate, TemplateOptions};
pub use transformed_module::{CorrelatedSpan, TemplateBounds, TransformedModule};
