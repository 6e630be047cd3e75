use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::paths::Paths;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractorConfig {
    /// "ollama" for the model-assisted extractor, "keyword" for the offline one.
    #[serde(default = "default_extractor_provider")]
    pub provider: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Use the keyword extractor when the model is unreachable.
    #[serde(default = "default_fallback")]
    pub fallback: bool,
}

fn default_extractor_provider() -> String {
    "ollama".to_string()
}

fn default_api_base() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "phi3:mini".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_fallback() -> bool {
    true
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            provider: default_extractor_provider(),
            api_base: default_api_base(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            fallback: default_fallback(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginsConfig {
    /// Extra plugin roots, searched after the built-in and user directories.
    #[serde(default)]
    pub dirs: Vec<String>,
    #[serde(default = "default_auto_load")]
    pub auto_load: bool,
    /// Plugins that are discovered but not loaded at startup.
    #[serde(default)]
    pub disabled: Vec<String>,
}

fn default_auto_load() -> bool {
    true
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            auto_load: default_auto_load(),
            disabled: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    #[serde(default)]
    pub database: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_workspace")]
    pub workspace: String,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub plugins: PluginsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_workspace() -> String {
    ".".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            extractor: ExtractorConfig::default(),
            plugins: PluginsConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        json5::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Directory that relative capability paths resolve against.
    pub fn workspace_dir(&self) -> PathBuf {
        let raw = self.workspace.trim();
        if let Some(rest) = raw.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(raw)
    }

    pub fn database_path(&self, paths: &Paths) -> PathBuf {
        match self.storage.database.as_deref().map(str::trim) {
            Some(db) if !db.is_empty() => PathBuf::from(db),
            _ => paths.database_file(),
        }
    }

    /// Plugin roots in search order: built-in, user, then configured extras.
    pub fn plugin_dirs(&self, paths: &Paths) -> Vec<PathBuf> {
        let mut dirs = vec![paths.builtin_plugins_dir(), paths.plugins_dir()];
        dirs.extend(self.plugins.dirs.iter().map(PathBuf::from));
        dirs
    }
}
