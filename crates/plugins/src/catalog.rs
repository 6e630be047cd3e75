use std::collections::HashMap;
use tracing::debug;

use crate::builtin::{DataAnalyzerPlugin, FileProcessorPlugin, WebScraperPlugin};
use crate::Plugin;

pub type PluginFactory = fn() -> Box<dyn Plugin>;

/// Compiled-in provider ids a `plugin.yaml` may name.
#[derive(Clone, Default)]
pub struct PluginCatalog {
    factories: HashMap<String, PluginFactory>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register("file_processor", || Box::new(FileProcessorPlugin::default()));
        catalog.register("data_analyzer", || Box::new(DataAnalyzerPlugin::default()));
        catalog.register("web_scraper", || Box::new(WebScraperPlugin::default()));
        catalog
    }

    pub fn register(&mut self, id: &str, factory: PluginFactory) {
        debug!(id, "Registering plugin provider");
        self.factories.insert(id.to_string(), factory);
    }

    pub fn create(&self, id: &str) -> Option<Box<dyn Plugin>> {
        self.factories.get(id).map(|factory| factory())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.factories.keys().cloned().collect();
        ids.sort();
        ids
    }
}
