//! Persistent configuration for wpdocs.
//!
//! Loads/saves a TOML config at `~/.wpdocs/config.toml`.

use crate::WpdocsError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level wpdocs configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WpdocsConfig {
    pub index: IndexConfig,
    pub resolver: ResolverConfig,
}

impl WpdocsConfig {
    /// Load configuration from the given path.
    pub fn load(path: &Path) -> Result<Self, WpdocsError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| WpdocsError::Config(e.to_string()))
    }

    /// Save configuration to the given path.
    pub fn save(&self, path: &Path) -> Result<(), WpdocsError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| WpdocsError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load `path` if it exists, defaults otherwise. A file that exists but
    /// does not parse is an error, not a silent fallback.
    pub fn load_or_default(path: &Path) -> Result<Self, WpdocsError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Default config path: `~/.wpdocs/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".wpdocs")
            .join("config.toml")
    }
}

/// Ingestion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Number of parallel extraction workers.
    pub workers: usize,
    /// Directory names never descended into when discovering files.
    pub skip_dirs: Vec<String>,
    pub php_extensions: Vec<String>,
    pub js_extensions: Vec<String>,
    /// Stop claiming new files after this many seconds.
    pub deadline_secs: Option<u64>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            skip_dirs: ["vendor", "node_modules", ".git", "tests", "test"]
                .into_iter()
                .map(String::from)
                .collect(),
            php_extensions: vec!["php".to_string()],
            js_extensions: ["js", "ts", "jsx", "tsx"]
                .into_iter()
                .map(String::from)
                .collect(),
            deadline_secs: None,
        }
    }
}

/// How far up the inheritance chain override detection looks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideScope {
    /// Only the owner's direct superclasses.
    Immediate,
    /// Every ancestor, nearest first.
    #[default]
    Ancestors,
}

impl std::str::FromStr for OverrideScope {
    type Err = WpdocsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "immediate" => Ok(Self::Immediate),
            "ancestors" => Ok(Self::Ancestors),
            _ => Err(WpdocsError::Config(format!("unknown override scope: {s}"))),
        }
    }
}

/// Cross-reference resolution settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub override_scope: OverrideScope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrips_through_toml() {
        let config = WpdocsConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).expect("default config should serialize to TOML");
        let parsed: WpdocsConfig =
            toml::from_str(&toml_str).expect("serialized TOML should parse back");
        assert_eq!(parsed, config);
        assert_eq!(parsed.index.workers, 8);
        assert_eq!(parsed.resolver.override_scope, OverrideScope::Ancestors);
    }

    #[test]
    fn load_nonexistent_returns_error() {
        let result = WpdocsConfig::load(Path::new("/tmp/nonexistent_wpdocs_config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join("wpdocs_config_test");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("config.toml");

        let mut config = WpdocsConfig::default();
        config.index.workers = 2;
        config.index.deadline_secs = Some(30);
        config.resolver.override_scope = OverrideScope::Immediate;

        config.save(&path).expect("save should succeed");
        let loaded = WpdocsConfig::load(&path).expect("load should succeed");

        assert_eq!(loaded.index.workers, 2);
        assert_eq!(loaded.index.deadline_secs, Some(30));
        assert_eq!(loaded.resolver.override_scope, OverrideScope::Immediate);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_or_default_falls_back_only_when_missing() {
        let dir = std::env::temp_dir().join("wpdocs_config_or_default");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let config = WpdocsConfig::load_or_default(&path).unwrap();
        assert_eq!(config, WpdocsConfig::default());

        std::fs::write(&path, "[index]\nworkers = 3\n").unwrap();
        assert_eq!(WpdocsConfig::load_or_default(&path).unwrap().index.workers, 3);

        std::fs::write(&path, "[index\nworkers = ").unwrap();
        let err = WpdocsConfig::load_or_default(&path).unwrap_err();
        assert!(matches!(err, WpdocsError::Config(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn default_path_ends_with_config_toml() {
        let path = WpdocsConfig::default_path();
        assert!(path.ends_with("config.toml"));
    }

    #[test]
    fn partial_toml_uses_defaults_for_missing_fields() {
        let partial = r#"
[resolver]
override_scope = "immediate"
"#;
        let config: WpdocsConfig = toml::from_str(partial).expect("partial TOML should parse");
        assert_eq!(config.resolver.override_scope, OverrideScope::Immediate);
        assert_eq!(config.index.workers, 8);
        assert!(config.index.skip_dirs.contains(&"node_modules".to_string()));
    }

    #[test]
    fn override_scope_parses_case_insensitively() {
        assert_eq!("Immediate".parse::<OverrideScope>().unwrap(), OverrideScope::Immediate);
        assert_eq!("ancestors".parse::<OverrideScope>().unwrap(), OverrideScope::Ancestors);
        assert!("transitive".parse::<OverrideScope>().is_err());
    }
}
