use orion_core::{Config, Error, Paths, Result};
use orion_plugins::{LoadReport, PluginCatalog, PluginManager};
use orion_providers::{create_extractor, CallExtractor};
use orion_storage::{ContextStore, Database, HistoryLog, PreferenceStore};
use orion_tools::{CapabilityContext, CapabilityRegistry, Dispatcher, SharedRegistry};
use std::sync::Arc;
use tracing::{info, warn};

use crate::conversation::Conversation;
use crate::preference_adapter::PreferenceStoreAdapter;
use crate::runner::PlanRunner;

/// Everything one interactive or one-shot run needs, wired from config.
pub struct Session {
    pub config: Config,
    pub registry: SharedRegistry,
    pub plugins: PluginManager,
    pub conversation: Conversation,
    pub preferences: PreferenceStore,
    /// Set when plugins were auto-loaded at startup.
    pub plugin_report: Option<LoadReport>,
}

impl Session {
    /// Open the session with the extractor described by `config`.
    pub fn open(paths: &Paths, config: Config) -> Result<Self> {
        let extractor = create_extractor(&config.extractor);
        Self::open_with_extractor(paths, config, extractor)
    }

    pub fn open_with_extractor(
        paths: &Paths,
        config: Config,
        extractor: Arc<dyn CallExtractor>,
    ) -> Result<Self> {
        let workspace = config.workspace_dir();
        if !workspace.is_dir() {
            return Err(Error::Config(format!(
                "Workspace directory does not exist: {}",
                workspace.display()
            )));
        }

        let db = Database::open(&config.database_path(paths))?;
        let context = Arc::new(ContextStore::load(db.clone())?);
        let history = HistoryLog::new(db.clone());
        let preferences = PreferenceStore::new(db);

        let registry = CapabilityRegistry::with_builtins().into_shared();

        let mut plugins = PluginManager::new(
            config.plugin_dirs(paths),
            PluginCatalog::builtin(),
            registry.clone(),
        );
        let plugin_report = if config.plugins.auto_load {
            let report = plugins.load_all(&config.plugins.disabled);
            for (name, reason) in &report.failed {
                warn!(plugin = %name, reason = %reason, "Plugin not loaded");
            }
            Some(report)
        } else {
            None
        };

        let ctx = CapabilityContext::new(workspace)
            .with_preferences(Arc::new(PreferenceStoreAdapter::new(preferences.clone())));
        let dispatcher = Dispatcher::new(registry.clone(), ctx);

        let capabilities = registry
            .read()
            .map(|r| r.len())
            .map_err(|e| Error::Other(format!("Registry lock error: {}", e)))?;
        info!(
            capabilities,
            plugins = plugins.enabled_names().len(),
            extractor = extractor.name(),
            "Session ready"
        );

        let conversation = Conversation::new(PlanRunner::new(dispatcher), extractor, context, history);
        Ok(Self {
            config,
            registry,
            plugins,
            conversation,
            preferences,
            plugin_report,
        })
    }

    pub fn context(&self) -> &ContextStore {
        self.conversation.context()
    }

    pub fn history(&self) -> &HistoryLog {
        self.conversation.history()
    }

    pub fn runner(&self) -> &PlanRunner {
        self.conversation.runner()
    }

    /// Shut plugins down; their capabilities leave the registry.
    pub fn close(mut self) {
        self.plugins.shutdown_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConversationResult;
    use orion_providers::KeywordExtractor;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_plugin(root: &Path, name: &str, provider: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("meta.yaml"), format!("name: {}\nversion: 1.0.0\n", name)).unwrap();
        std::fs::write(dir.join("plugin.yaml"), format!("provider: {}\n", provider)).unwrap();
    }

    fn config_for(dir: &TempDir, plugin_root: &Path) -> Config {
        let mut config = Config::default();
        config.workspace = dir.path().join("work").display().to_string();
        config.plugins.dirs = vec![plugin_root.display().to_string()];
        config
    }

    #[tokio::test]
    async fn test_open_loads_plugins_and_processes() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("work")).unwrap();
        let plugin_root = dir.path().join("extra_plugins");
        write_plugin(&plugin_root, "fp", "file_processor");
        write_plugin(&plugin_root, "broken", "no_such_provider");

        let paths = Paths::with_base(dir.path().join("home"));
        let config = config_for(&dir, &plugin_root);
        let session =
            Session::open_with_extractor(&paths, config, Arc::new(KeywordExtractor::new())).unwrap();

        let report = session.plugin_report.as_ref().unwrap();
        assert!(report.loaded.contains(&"fp".to_string()));
        assert!(report.failed.iter().any(|(name, _)| name == "broken"));
        assert!(session.registry.read().unwrap().contains("find_duplicates"));

        let result = session.conversation.process("creá carpeta reportes").await.unwrap();
        assert!(matches!(result, ConversationResult::Action { .. }));
        assert!(dir.path().join("work/reportes").is_dir());
        assert!(paths.database_file().exists());

        session.close();
    }

    #[test]
    fn test_disabled_plugins_are_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("work")).unwrap();
        let plugin_root = dir.path().join("extra_plugins");
        write_plugin(&plugin_root, "fp", "file_processor");

        let mut config = config_for(&dir, &plugin_root);
        config.plugins.disabled = vec!["fp".to_string()];
        let paths = Paths::with_base(dir.path().join("home"));
        let session =
            Session::open_with_extractor(&paths, config, Arc::new(KeywordExtractor::new())).unwrap();
        assert!(!session.plugins.is_loaded("fp"));
        let report = session.plugin_report.as_ref().unwrap();
        assert_eq!(report.skipped, vec!["fp".to_string()]);
    }

    #[test]
    fn test_missing_workspace_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.workspace = dir.path().join("absent").display().to_string();
        config.plugins.auto_load = false;
        let paths = Paths::with_base(dir.path().join("home"));
        let result = Session::open_with_extractor(&paths, config, Arc::new(KeywordExtractor::new()));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
