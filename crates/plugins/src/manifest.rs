use orion_core::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Package marker; its presence makes a directory a plugin candidate.
pub const META_FILE: &str = "meta.yaml";
/// Provider definition; names the compiled-in provider to instantiate.
pub const DEFINITION_FILE: &str = "plugin.yaml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PluginMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    /// Binaries that must be on `PATH`.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl PluginMeta {
    /// An empty marker file is a valid marker.
    pub fn load(dir: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(dir.join(META_FILE))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PluginDefinition {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl PluginDefinition {
    pub fn load(dir: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(dir.join(DEFINITION_FILE))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// Whether `dir` holds both plugin files.
pub fn is_plugin_dir(dir: &Path) -> bool {
    dir.is_dir() && dir.join(META_FILE).is_file() && dir.join(DEFINITION_FILE).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_manifests() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(META_FILE),
            "name: web_scraper\nversion: 1.0.0\ndependencies: [curl]\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join(DEFINITION_FILE),
            "provider: web_scraper\nconfig:\n  max_links: 20\n",
        )
        .unwrap();

        assert!(is_plugin_dir(dir.path()));
        let meta = PluginMeta::load(dir.path()).unwrap();
        assert_eq!(meta.name, "web_scraper");
        assert_eq!(meta.dependencies, vec!["curl".to_string()]);

        let def = PluginDefinition::load(dir.path()).unwrap();
        assert_eq!(def.provider.as_deref(), Some("web_scraper"));
        assert_eq!(def.config["max_links"], 20);
    }

    #[test]
    fn test_empty_files_are_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(META_FILE), "").unwrap();
        std::fs::write(dir.path().join(DEFINITION_FILE), "\n").unwrap();
        assert_eq!(PluginMeta::load(dir.path()).unwrap(), PluginMeta::default());
        assert!(PluginDefinition::load(dir.path()).unwrap().provider.is_none());
    }

    #[test]
    fn test_marker_alone_is_not_a_plugin() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(META_FILE), "name: x").unwrap();
        assert!(!is_plugin_dir(dir.path()));
    }

    #[test]
    fn test_malformed_definition_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DEFINITION_FILE), "provider: [unterminated").unwrap();
        assert!(PluginDefinition::load(dir.path()).is_err());
    }
}
