//! Cheap test for whether a file could contain an embedding.

use regex::Regex;

use crate::config::GlintEnvironment;
use crate::error::ConfigError;

/// Matches any configured tag import source, plus `<template` when native
/// templates are enabled.
///
/// A miss guarantees the file has no embeddings; a hit only means it might.
#[derive(Debug, Clone)]
pub struct EmbeddingPrefilter {
    pattern: Option<Regex>,
}

impl EmbeddingPrefilter {
    pub fn new(environment: &GlintEnvironment) -> Result<Self, ConfigError> {
        let mut alternatives: Vec<String> = environment.tag_sources().map(regex::escape).collect();
        if environment.native_template.is_some() {
            alternatives.push(regex::escape("<template"));
        }

        let pattern = if alternatives.is_empty() {
            None
        } else {
            Some(Regex::new(&alternatives.join("|"))?)
        };
        Ok(Self { pattern })
    }

    pub fn may_contain_embedding(&self, contents: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(contents))
    }
}
