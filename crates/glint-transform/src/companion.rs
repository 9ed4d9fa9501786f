//! Pairing of scripts with companion template files.
//!
//! Three layouts are recognized:
//!
//! - colocated: `app/components/foo.ts` + `app/components/foo.hbs`
//! - pod: `app/components/foo/component.ts` + `app/components/foo/template.hbs`
//! - classic: `app/components/foo.ts` + `app/templates/components/foo.hbs`,
//!   used only when no colocated template exists
//!
//! File access goes through [`FileSystem`] so the transform itself does no
//! I/O.

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;

use crate::config::CompanionConfig;

/// Read access to the files a transform may look at.
pub trait FileSystem: Send + Sync {
    fn file_exists(&self, path: &Utf8Path) -> bool;

    /// Returns `None` if the file does not exist or cannot be read.
    fn read_file(&self, path: &Utf8Path) -> Option<String>;
}

/// An in-memory [`FileSystem`].
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: FxHashMap<Utf8PathBuf, String>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file.
    pub fn insert(&mut self, path: impl Into<Utf8PathBuf>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }

    /// Builder-style [`MemoryFileSystem::insert`].
    pub fn with_file(mut self, path: impl Into<Utf8PathBuf>, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }
}

impl FileSystem for MemoryFileSystem {
    fn file_exists(&self, path: &Utf8Path) -> bool {
        self.files.contains_key(path)
    }

    fn read_file(&self, path: &Utf8Path) -> Option<String> {
        self.files.get(path).cloned()
    }
}

/// A possible companion path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: Utf8PathBuf,
    /// Paths that take precedence: the candidate only applies when none of
    /// them exist.
    pub defer_to: Vec<Utf8PathBuf>,
}

impl Candidate {
    fn new(path: Utf8PathBuf) -> Self {
        Self {
            path,
            defer_to: Vec::new(),
        }
    }

    fn is_chosen(&self, fs: &dyn FileSystem) -> bool {
        fs.file_exists(&self.path) && !self.defer_to.iter().any(|path| fs.file_exists(path))
    }
}

/// Template paths that could belong to `script`, in priority order.
pub fn template_candidates(script: &Utf8Path, rules: &CompanionConfig) -> Vec<Candidate> {
    let Some(stem) = strip_any_extension(script, &rules.script_extensions) else {
        return Vec::new();
    };
    let ext = &rules.template_extension;
    let colocated = Utf8PathBuf::from(format!("{stem}{ext}"));

    let mut candidates = vec![Candidate::new(colocated.clone())];

    if rules.pod_layout && script.file_stem() == Some("component") {
        if let Some(dir) = script.parent() {
            candidates.push(Candidate::new(dir.join(format!("template{ext}"))));
        }
    }

    if let Some(layout) = ClassicLayout::new(rules) {
        if let Some((prefix, rest)) = split_around(stem, &layout.components_dir) {
            candidates.push(Candidate {
                path: Utf8PathBuf::from(format!(
                    "{prefix}{}{rest}{ext}",
                    layout.template_components_dir
                )),
                defer_to: vec![colocated],
            });
        }
    }

    candidates
}

/// Script paths that could belong to `template`, in priority order.
pub fn script_candidates(template: &Utf8Path, rules: &CompanionConfig) -> Vec<Candidate> {
    let Some(stem) = template.as_str().strip_suffix(rules.template_extension.as_str()) else {
        return Vec::new();
    };

    let mut candidates: Vec<Candidate> = rules
        .script_extensions
        .iter()
        .map(|ext| Candidate::new(Utf8PathBuf::from(format!("{stem}{ext}"))))
        .collect();

    if rules.pod_layout && template.file_stem() == Some("template") {
        if let Some(dir) = template.parent() {
            candidates.extend(
                rules
                    .script_extensions
                    .iter()
                    .map(|ext| Candidate::new(dir.join(format!("component{ext}")))),
            );
        }
    }

    if let Some(layout) = ClassicLayout::new(rules) {
        if let Some((prefix, rest)) = split_around(stem, &layout.template_components_dir) {
            let colocated_template = Utf8PathBuf::from(format!(
                "{prefix}{}{rest}{}",
                layout.components_dir, rules.template_extension
            ));
            candidates.extend(rules.script_extensions.iter().map(|ext| Candidate {
                path: Utf8PathBuf::from(format!("{prefix}{}{rest}{ext}", layout.components_dir)),
                defer_to: vec![colocated_template.clone()],
            }));
        }
    }

    candidates
}

/// The companion template for `script`, if one exists.
pub fn find_companion_template(
    script: &Utf8Path,
    rules: &CompanionConfig,
    fs: &dyn FileSystem,
) -> Option<Utf8PathBuf> {
    template_candidates(script, rules)
        .into_iter()
        .find(|candidate| candidate.is_chosen(fs))
        .map(|candidate| candidate.path)
}

/// The script `template` belongs to, if one exists.
pub fn find_companion_script(
    template: &Utf8Path,
    rules: &CompanionConfig,
    fs: &dyn FileSystem,
) -> Option<Utf8PathBuf> {
    script_candidates(template, rules)
        .into_iter()
        .find(|candidate| candidate.is_chosen(fs))
        .map(|candidate| candidate.path)
}

/// `app/components/` and `app/templates/components/` for a classic
/// templates dir of `app/templates`.
struct ClassicLayout {
    components_dir: String,
    template_components_dir: String,
}

impl ClassicLayout {
    fn new(rules: &CompanionConfig) -> Option<Self> {
        let templates_dir = Utf8Path::new(rules.classic_templates_dir.as_deref()?);
        let app_dir = templates_dir.parent()?;
        Some(Self {
            components_dir: format!("{}/", app_dir.join("components")),
            template_components_dir: format!("{}/", templates_dir.join("components")),
        })
    }
}

/// Splits `path` at the first occurrence of the directory `dir`, which must
/// start the path or follow a separator.
fn split_around<'a>(path: &'a str, dir: &str) -> Option<(&'a str, &'a str)> {
    if let Some(rest) = path.strip_prefix(dir) {
        return Some(("", rest));
    }
    let index = path.find(&format!("/{dir}"))? + 1;
    Some((&path[..index], &path[index + dir.len()..]))
}

fn strip_any_extension<'a>(path: &'a Utf8Path, extensions: &[String]) -> Option<&'a str> {
    extensions
        .iter()
        .find_map(|ext| path.as_str().strip_suffix(ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GlintEnvironment;
    use pretty_assertions::assert_eq;

    fn rules() -> CompanionConfig {
        GlintEnvironment::default().companion.unwrap()
    }

    fn paths(candidates: Vec<Candidate>) -> Vec<String> {
        candidates
            .into_iter()
            .map(|candidate| candidate.path.to_string())
            .collect()
    }

    #[test]
    fn test_template_candidates() {
        let rules = rules();
        assert_eq!(
            paths(template_candidates(Utf8Path::new("app/components/foo.ts"), &rules)),
            vec!["app/components/foo.hbs", "app/templates/components/foo.hbs"]
        );
        assert_eq!(
            paths(template_candidates(
                Utf8Path::new("/repo/app/components/foo/component.js"),
                &rules
            )),
            vec![
                "/repo/app/components/foo/component.hbs",
                "/repo/app/components/foo/template.hbs",
                "/repo/app/templates/components/foo/component.hbs",
            ]
        );
        assert!(template_candidates(Utf8Path::new("styles.css"), &rules).is_empty());
    }

    #[test]
    fn test_script_candidates() {
        let rules = rules();
        assert_eq!(
            paths(script_candidates(Utf8Path::new("lib/foo/template.hbs"), &rules)),
            vec![
                "lib/foo/template.ts",
                "lib/foo/template.gts",
                "lib/foo/template.js",
                "lib/foo/template.gjs",
                "lib/foo/component.ts",
                "lib/foo/component.gts",
                "lib/foo/component.js",
                "lib/foo/component.gjs",
            ]
        );
    }

    #[test]
    fn test_colocated_template_wins() {
        let rules = rules();
        let fs = MemoryFileSystem::new()
            .with_file("app/components/foo.ts", "")
            .with_file("app/components/foo.hbs", "")
            .with_file("app/templates/components/foo.hbs", "");

        assert_eq!(
            find_companion_template(Utf8Path::new("app/components/foo.ts"), &rules, &fs),
            Some(Utf8PathBuf::from("app/components/foo.hbs"))
        );
        // The classic template defers to the colocated one.
        assert_eq!(
            find_companion_script(
                Utf8Path::new("app/templates/components/foo.hbs"),
                &rules,
                &fs
            ),
            None
        );
    }

    #[test]
    fn test_classic_layout() {
        let rules = rules();
        let fs = MemoryFileSystem::new()
            .with_file("app/components/nav/bar.js", "")
            .with_file("app/templates/components/nav/bar.hbs", "");

        assert_eq!(
            find_companion_template(Utf8Path::new("app/components/nav/bar.js"), &rules, &fs),
            Some(Utf8PathBuf::from("app/templates/components/nav/bar.hbs"))
        );
        assert_eq!(
            find_companion_script(
                Utf8Path::new("app/templates/components/nav/bar.hbs"),
                &rules,
                &fs
            ),
            Some(Utf8PathBuf::from("app/components/nav/bar.js"))
        );
    }

    #[test]
    fn test_pod_layout_can_be_disabled() {
        let mut rules = rules();
        rules.pod_layout = false;
        rules.classic_templates_dir = None;
        assert_eq!(
            paths(template_candidates(Utf8Path::new("x/component.ts"), &rules)),
            vec!["x/component.hbs"]
        );
    }
}
