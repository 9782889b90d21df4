//! Project configuration (§10.3): `psxc.toml` in the project root, or an
//! explicit `--config <path>`, layered under whatever the CLI flags
//! supply. Absence of a config file is not an error — CLI flags layer
//! over an optional project file, and compiled-in defaults apply when
//! neither is present.

use std::path::Path;

use serde::Deserialize;

fn default_recursive() -> bool {
    false
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project-wide source root, relative to the config file's directory.
    pub source_root: Option<String>,
    pub output_dir: Option<String>,
    #[serde(default = "default_recursive")]
    pub recursive: bool,
    /// Builtin names available to the resolver's builtins lookup tier (§4.3).
    pub runtime_prelude: Vec<String>,
    /// Glob patterns excluded from directory enumeration.
    pub exclude: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_root: None,
            output_dir: None,
            recursive: false,
            runtime_prelude: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

impl Config {
    /// Loads `path` if given, else `psxc.toml` in the current directory
    /// if it exists, else the compiled-in default.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        match path {
            Some(explicit) => {
                let text = std::fs::read_to_string(explicit)
                    .map_err(|e| format!("{}: {}", explicit.display(), e))?;
                toml::from_str(&text).map_err(|e| format!("{}: {}", explicit.display(), e))
            }
            None => {
                let default_path = Path::new("psxc.toml");
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                let text = std::fs::read_to_string(default_path)
                    .map_err(|e| format!("{}: {}", default_path.display(), e))?;
                toml::from_str(&text).map_err(|e| format!("{}: {}", default_path.display(), e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_explicit_config_is_an_error() {
        let err = Config::load(Some(Path::new("/definitely/missing/psxc.toml"))).unwrap_err();
        assert!(err.contains("psxc.toml"));
    }

    #[test]
    fn absent_default_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let config = Config::load(None);
        std::env::set_current_dir(original).unwrap();
        let config = config.unwrap();
        assert!(!config.recursive);
        assert!(config.exclude.is_empty());
    }

    #[test]
    fn parses_a_full_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("psxc.toml");
        std::fs::write(
            &config_path,
            r#"
            source_root = "src"
            output_dir = "dist"
            recursive = true
            runtime_prelude = ["render_context"]
            exclude = ["**/vendor/**"]
            "#,
        )
        .unwrap();
        let config = Config::load(Some(&config_path)).unwrap();
        assert_eq!(config.source_root.as_deref(), Some("src"));
        assert!(config.recursive);
        assert_eq!(config.runtime_prelude, vec!["render_context".to_string()]);
    }
}
