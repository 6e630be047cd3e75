use orion_tools::SharedRegistry;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::manifest::{is_plugin_dir, PluginDefinition, PluginMeta};
use crate::{Plugin, PluginCatalog, PluginRegistrar};

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Plugin not found: {0}")]
    NotFound(String),

    #[error("Failed to import plugin {name}: {reason}")]
    Import { name: String, reason: String },

    #[error("No provider type found for plugin {name} (provider: {provider})")]
    NoProvider { name: String, provider: String },

    #[error("Plugin {name} failed to initialize: {reason}")]
    Initialization { name: String, reason: String },

    #[error("Plugin not loaded: {0}")]
    NotLoaded(String),

    #[error("Plugin {name} failed to shut down: {reason}")]
    Shutdown { name: String, reason: String },

    #[error("Capability registry unavailable: {0}")]
    Registry(String),
}

impl From<PluginError> for orion_core::Error {
    fn from(e: PluginError) -> Self {
        orion_core::Error::Plugin(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    Enabled,
    Disabled,
    Failed,
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PluginState::Enabled => "enabled",
            PluginState::Disabled => "disabled",
            PluginState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PluginDescriptor {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub dependencies: Vec<String>,
    pub enabled: bool,
    pub loaded: bool,
    pub last_error: Option<String>,
    pub path: PathBuf,
    /// Capabilities registered on load.
    pub capabilities: Vec<String>,
}

impl PluginDescriptor {
    fn from_meta(name: &str, dir: &Path, meta: &PluginMeta) -> Self {
        Self {
            name: name.to_string(),
            version: meta.version.clone(),
            description: meta.description.clone(),
            author: meta.author.clone(),
            dependencies: meta.dependencies.clone(),
            enabled: false,
            loaded: false,
            last_error: None,
            path: dir.to_path_buf(),
            capabilities: Vec::new(),
        }
    }

    pub fn state(&self) -> PluginState {
        match (self.loaded, self.enabled) {
            (true, true) => PluginState::Enabled,
            (true, false) => PluginState::Disabled,
            (false, _) => PluginState::Failed,
        }
    }
}

/// Outcome of `load_all`. One plugin's failure never stops the others.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub discovered: Vec<String>,
    pub loaded: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub skipped: Vec<String>,
}

impl LoadReport {
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }
}

struct LoadedPlugin {
    instance: Box<dyn Plugin>,
    descriptor: PluginDescriptor,
}

/// Discovers plugin directories, instantiates their providers from the
/// catalog and drives their lifecycle against the shared registry.
pub struct PluginManager {
    plugin_dirs: Vec<PathBuf>,
    catalog: PluginCatalog,
    registry: SharedRegistry,
    plugins: HashMap<String, LoadedPlugin>,
    failures: HashMap<String, PluginDescriptor>,
}

impl PluginManager {
    pub fn new(plugin_dirs: Vec<PathBuf>, catalog: PluginCatalog, registry: SharedRegistry) -> Self {
        Self {
            plugin_dirs,
            catalog,
            registry,
            plugins: HashMap::new(),
            failures: HashMap::new(),
        }
    }

    pub fn plugin_dirs(&self) -> &[PathBuf] {
        &self.plugin_dirs
    }

    /// Names of plugin directories under the configured roots. The first
    /// root holding a name wins.
    pub fn discover(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for root in &self.plugin_dirs {
            let Ok(entries) = std::fs::read_dir(root) else {
                debug!(dir = %root.display(), "Plugin directory not readable, skipping");
                continue;
            };
            let mut names: Vec<String> = entries
                .filter_map(|e| e.ok())
                .filter(|e| is_plugin_dir(&e.path()))
                .map(|e| e.file_name().to_string_lossy().to_string())
                .filter(|n| !n.starts_with('_') && !n.starts_with('.'))
                .collect();
            names.sort();
            for name in names {
                if seen.insert(name.clone()) {
                    found.push(name);
                }
            }
        }
        debug!(count = found.len(), "Discovered plugins");
        found
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        let hidden = name.starts_with('.') || name.starts_with('_');
        if name.is_empty() || hidden || name.contains('/') || name.contains('\\') {
            return None;
        }
        self.plugin_dirs
            .iter()
            .map(|root| root.join(name))
            .find(|dir| is_plugin_dir(dir))
    }

    /// Load, initialize, register and enable a plugin. Loading a plugin that
    /// is already loaded succeeds without doing anything.
    pub fn load(&mut self, name: &str) -> Result<(), PluginError> {
        if self.plugins.contains_key(name) {
            debug!(plugin = name, "Plugin already loaded");
            return Ok(());
        }
        let dir = self
            .locate(name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        info!(plugin = name, path = %dir.display(), "Loading plugin");

        let meta = PluginMeta::load(&dir).unwrap_or_default();
        match self.activate(name, &dir) {
            Ok(loaded) => {
                info!(
                    plugin = name,
                    version = %loaded.descriptor.version,
                    capabilities = loaded.descriptor.capabilities.len(),
                    "Plugin loaded"
                );
                self.failures.remove(name);
                self.plugins.insert(name.to_string(), loaded);
                Ok(())
            }
            Err(e) => {
                error!(plugin = name, error = %e, "Plugin failed to load");
                let mut descriptor = PluginDescriptor::from_meta(name, &dir, &meta);
                descriptor.last_error = Some(e.to_string());
                self.failures.insert(name.to_string(), descriptor);
                Err(e)
            }
        }
    }

    fn activate(&self, name: &str, dir: &Path) -> Result<LoadedPlugin, PluginError> {
        let import = |reason: String| PluginError::Import {
            name: name.to_string(),
            reason,
        };
        let meta = PluginMeta::load(dir).map_err(|e| import(e.to_string()))?;
        let definition = PluginDefinition::load(dir).map_err(|e| import(e.to_string()))?;

        let provider = definition
            .provider
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or_default()
            .to_string();
        let mut instance = self
            .catalog
            .create(&provider)
            .ok_or_else(|| PluginError::NoProvider {
                name: name.to_string(),
                provider: if provider.is_empty() { "<none>".to_string() } else { provider.clone() },
            })?;

        instance.configure(&definition.config);

        let mut dependencies = meta.dependencies.clone();
        for dep in instance.dependencies() {
            if !dependencies.contains(&dep) {
                dependencies.push(dep);
            }
        }
        let missing: Vec<&str> = dependencies
            .iter()
            .filter(|bin| which::which(bin.as_str()).is_err())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(PluginError::Initialization {
                name: name.to_string(),
                reason: format!("missing dependencies: {}", missing.join(", ")),
            });
        }

        instance.initialize().map_err(|e| PluginError::Initialization {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        let capabilities = {
            let mut registry = match self.registry.write() {
                Ok(r) => r,
                Err(e) => {
                    let _ = instance.shutdown();
                    return Err(PluginError::Registry(e.to_string()));
                }
            };
            let mut registrar = PluginRegistrar::new(&mut registry, name);
            instance.register_capabilities(&mut registrar);
            registrar.into_registered()
        };
        instance.on_enable();

        let descriptor = PluginDescriptor {
            name: name.to_string(),
            version: non_empty(&meta.version, instance.version()),
            description: non_empty(&meta.description, instance.description()),
            author: non_empty(&meta.author, instance.author()),
            dependencies,
            enabled: true,
            loaded: true,
            last_error: None,
            path: dir.to_path_buf(),
            capabilities,
        };
        Ok(LoadedPlugin {
            instance,
            descriptor,
        })
    }

    /// Disable, shut down and forget a plugin, retracting the capabilities it
    /// still owns. A shutdown error is reported after the plugin is removed.
    pub fn unload(&mut self, name: &str) -> Result<(), PluginError> {
        let mut loaded = self
            .plugins
            .remove(name)
            .ok_or_else(|| PluginError::NotLoaded(name.to_string()))?;

        if loaded.descriptor.enabled {
            loaded.instance.on_disable();
        }
        let shutdown = loaded.instance.shutdown();

        let retracted = match self.registry.write() {
            Ok(mut registry) => registry.retract_owner(name),
            Err(e) => {
                warn!(plugin = name, error = %e, "Could not retract capabilities");
                Vec::new()
            }
        };
        info!(plugin = name, retracted = retracted.len(), "Plugin unloaded");

        shutdown.map_err(|e| PluginError::Shutdown {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Unload then load; an unload error aborts before loading again.
    pub fn reload(&mut self, name: &str) -> Result<(), PluginError> {
        if self.plugins.contains_key(name) {
            self.unload(name)?;
        }
        self.load(name)
    }

    pub fn enable(&mut self, name: &str) -> Result<(), PluginError> {
        let loaded = self
            .plugins
            .get_mut(name)
            .ok_or_else(|| PluginError::NotLoaded(name.to_string()))?;
        if !loaded.descriptor.enabled {
            loaded.descriptor.enabled = true;
            loaded.instance.on_enable();
            info!(plugin = name, "Plugin enabled");
        }
        Ok(())
    }

    pub fn disable(&mut self, name: &str) -> Result<(), PluginError> {
        let loaded = self
            .plugins
            .get_mut(name)
            .ok_or_else(|| PluginError::NotLoaded(name.to_string()))?;
        if loaded.descriptor.enabled {
            loaded.descriptor.enabled = false;
            loaded.instance.on_disable();
            info!(plugin = name, "Plugin disabled");
        }
        Ok(())
    }

    /// Discover and load every plugin whose name is not in `skip`.
    pub fn load_all(&mut self, skip: &[String]) -> LoadReport {
        let mut report = LoadReport {
            discovered: self.discover(),
            ..Default::default()
        };
        for name in report.discovered.clone() {
            if skip.contains(&name) {
                debug!(plugin = %name, "Plugin disabled in config, skipping");
                report.skipped.push(name);
                continue;
            }
            match self.load(&name) {
                Ok(()) => report.loaded.push(name),
                Err(e) => report.failed.push((name, e.to_string())),
            }
        }
        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Plugins loaded"
        );
        report
    }

    /// Unload everything, logging shutdown errors.
    pub fn shutdown_all(&mut self) {
        let mut names: Vec<String> = self.plugins.keys().cloned().collect();
        names.sort();
        for name in names {
            if let Err(e) = self.unload(&name) {
                warn!(plugin = %name, error = %e, "Plugin shutdown failed");
            }
        }
    }

    /// Loaded and failed plugins, sorted by name.
    pub fn list(&self) -> Vec<PluginDescriptor> {
        let mut all: Vec<PluginDescriptor> = self
            .plugins
            .values()
            .map(|p| p.descriptor.clone())
            .chain(self.failures.values().cloned())
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.plugins
            .get(name)
            .map(|p| &p.descriptor)
            .or_else(|| self.failures.get(name))
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.plugins
            .get(name)
            .map(|p| p.descriptor.enabled)
            .unwrap_or(false)
    }

    pub fn enabled_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .plugins
            .iter()
            .filter(|(_, p)| p.descriptor.enabled)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

fn non_empty(preferred: &str, fallback: &str) -> String {
    if preferred.trim().is_empty() {
        fallback.to_string()
    } else {
        preferred.to_string()
    }
}
