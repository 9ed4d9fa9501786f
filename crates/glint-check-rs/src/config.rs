//! Configuration loading.

use camino::{Utf8Path, Utf8PathBuf};
use glint_transform::GlintEnvironment;
use serde::Deserialize;
use std::fs;
use thiserror::Error;

/// Config file names looked up in the workspace root, in order.
pub const CONFIG_FILES: [&str; 2] = ["glint.config.json", ".glintrc.json"];

/// Script extensions walked when only embedded templates are enabled.
const EMBEDDING_EXTENSIONS: [&str; 4] = [".ts", ".gts", ".js", ".gjs"];

/// Project configuration.
#[derive(Debug, Clone, Default)]
pub struct GlintConfig {
    /// The file the configuration came from, if any.
    pub path: Option<Utf8PathBuf>,

    pub environment: GlintEnvironment,

    /// Glob patterns to exclude, relative to the workspace.
    pub exclude: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(flatten)]
    environment: GlintEnvironment,
}

/// An explicitly requested config file that could not be used.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        source: serde_json::Error,
    },
}

impl GlintConfig {
    /// Loads configuration from `explicit`, or from the first config file
    /// found in `workspace`.
    ///
    /// A discovered file that fails to parse is reported and replaced by the
    /// defaults; an explicit one is an error.
    pub fn load(workspace: &Utf8Path, explicit: Option<&Utf8Path>) -> Result<Self, ConfigLoadError> {
        if let Some(path) = explicit {
            let path = if path.is_relative() {
                workspace.join(path)
            } else {
                path.to_owned()
            };
            return Self::parse_config(&path);
        }

        for config_file in CONFIG_FILES {
            let config_path = workspace.join(config_file);
            if config_path.exists() {
                match Self::parse_config(&config_path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        eprintln!("Warning: {e}");
                        return Ok(Self::default());
                    }
                }
            }
        }

        Ok(Self::default())
    }

    fn parse_config(path: &Utf8Path) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
            path: path.to_owned(),
            source,
        })?;
        let file: ConfigFile =
            serde_json::from_str(&remove_json_comments(&content)).map_err(|source| {
                ConfigLoadError::Parse {
                    path: path.to_owned(),
                    source,
                }
            })?;

        tracing::debug!(path = %path, "loaded configuration");
        Ok(Self {
            path: Some(path.to_owned()),
            environment: file.environment,
            exclude: file.exclude,
        })
    }

    /// File extensions that can contain or be part of a module with
    /// templates.
    pub fn file_extensions(&self) -> Vec<&str> {
        let env = &self.environment;
        let mut extensions: Vec<&str> = Vec::new();
        if env.native_template.is_some() || !env.tags.is_empty() {
            extensions.extend(EMBEDDING_EXTENSIONS);
        }
        if let Some(companion) = &env.companion {
            extensions.extend(companion.script_extensions.iter().map(String::as_str));
            extensions.push(&companion.template_extension);
        }

        let mut seen = Vec::with_capacity(extensions.len());
        extensions.retain(|ext| {
            if seen.contains(ext) {
                false
            } else {
                seen.push(*ext);
                true
            }
        });
        extensions
    }
}

/// Removes `//` and `/* */` comments outside of strings.
fn remove_json_comments(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut chars = json.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            result.push(c);
            if c == '"' {
                in_string = false;
            } else if c == '\\' {
                if let Some(next) = chars.next() {
                    result.push(next);
                }
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                result.push(c);
                in_string = true;
            }
            ('/', Some('/')) => {
                while chars.peek().is_some_and(|&next| next != '\n') {
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                while let Some(next) = chars.next() {
                    if next == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => result.push(c),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn workspace() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_remove_comments() {
        let json = "{\n  // comment\n  \"a\": \"http://x\", /* block */ \"b\": 1\n}";
        let stripped = remove_json_comments(json);
        let value: serde_json::Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(value["a"], "http://x");
        assert_eq!(value["b"], 1);
    }

    #[test]
    fn test_defaults_without_config() {
        let (_dir, root) = workspace();
        let config = GlintConfig::load(&root, None).unwrap();
        assert!(config.path.is_none());
        assert_eq!(config.environment, GlintEnvironment::default());
        assert_eq!(
            config.file_extensions(),
            vec![".ts", ".gts", ".js", ".gjs", ".hbs"]
        );
    }

    #[test]
    fn test_discovered_config() {
        let (_dir, root) = workspace();
        fs::write(
            root.join(".glintrc.json"),
            r#"{
                // only native templates
                "nativeTemplate": { "typesModule": "@glint/native" },
                "exclude": ["legacy/**"]
            }"#,
        )
        .unwrap();

        let config = GlintConfig::load(&root, None).unwrap();
        assert_eq!(config.path, Some(root.join(".glintrc.json")));
        assert_eq!(config.exclude, vec!["legacy/**"]);
        assert!(config.environment.companion.is_none());
        assert_eq!(config.file_extensions(), vec![".ts", ".gts", ".js", ".gjs"]);
    }

    #[test]
    fn test_invalid_discovered_config_falls_back() {
        let (_dir, root) = workspace();
        fs::write(root.join("glint.config.json"), "{ not json").unwrap();
        let config = GlintConfig::load(&root, None).unwrap();
        assert!(config.path.is_none());
    }

    #[test]
    fn test_invalid_explicit_config_is_an_error() {
        let (_dir, root) = workspace();
        fs::write(root.join("custom.json"), r#"{ "tags": 1 }"#).unwrap();
        let err = GlintConfig::load(&root, Some(Utf8Path::new("custom.json"))).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse { .. }));

        let err = GlintConfig::load(&root, Some(Utf8Path::new("missing.json"))).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Read { .. }));
    }
}
