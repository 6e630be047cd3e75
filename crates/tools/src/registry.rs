use orion_core::CapabilitySchema;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::data::{AnalyzeDataCapability, ConvertCsvToJsonCapability};
use crate::fs::{CreateFileCapability, CreateFolderCapability, ListFilesCapability};
use crate::system::{GetCapabilitiesCapability, GetPreferenceCapability, SetPreferenceCapability};
use crate::web::DownloadFileCapability;
use crate::Capability;

/// Registry shared between the dispatcher, the plugin manager and the
/// `get_capabilities` built-in.
pub type SharedRegistry = Arc<RwLock<CapabilityRegistry>>;

struct Entry {
    capability: Arc<dyn Capability>,
    schema: CapabilitySchema,
    owner: Option<String>,
}

#[derive(Default)]
pub struct CapabilityRegistry {
    entries: HashMap<String, Entry>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        // Filesystem
        registry.register(Arc::new(CreateFolderCapability));
        registry.register(Arc::new(CreateFileCapability));
        registry.register(Arc::new(ListFilesCapability));

        // Network
        registry.register(Arc::new(DownloadFileCapability));

        // Tabular data
        registry.register(Arc::new(ConvertCsvToJsonCapability));
        registry.register(Arc::new(AnalyzeDataCapability));

        // Introspection and preferences
        registry.register(Arc::new(GetCapabilitiesCapability));
        registry.register(Arc::new(SetPreferenceCapability));
        registry.register(Arc::new(GetPreferenceCapability));

        registry
    }

    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Store a capability under its schema name. An existing entry with the
    /// same name is replaced.
    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.insert(capability, None);
    }

    /// Like `register`, but tags the entry with the plugin that provided it.
    pub fn register_owned(&mut self, capability: Arc<dyn Capability>, owner: &str) {
        self.insert(capability, Some(owner.to_string()));
    }

    fn insert(&mut self, capability: Arc<dyn Capability>, owner: Option<String>) {
        let schema = capability.schema();
        debug!(name = %schema.name, owner = ?owner, "Registering capability");
        self.entries.insert(
            schema.name.clone(),
            Entry {
                capability,
                schema,
                owner,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.entries.get(name).map(|e| Arc::clone(&e.capability))
    }

    pub fn schema(&self, name: &str) -> Option<&CapabilitySchema> {
        self.entries.get(name).map(|e| &e.schema)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn owner(&self, name: &str) -> Option<&str> {
        self.entries.get(name).and_then(|e| e.owner.as_deref())
    }

    /// All schemas, sorted by name.
    pub fn list(&self) -> Vec<CapabilitySchema> {
        let mut schemas: Vec<CapabilitySchema> =
            self.entries.values().map(|e| e.schema.clone()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Remove every entry still owned by `owner`; returns the removed names.
    pub fn retract_owner(&mut self, owner: &str) -> Vec<String> {
        let mut removed: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.owner.as_deref() == Some(owner))
            .map(|(name, _)| name.clone())
            .collect();
        removed.sort();
        for name in &removed {
            self.entries.remove(name);
        }
        if !removed.is_empty() {
            debug!(owner, count = removed.len(), "Retracted capabilities");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Prompt for the model-assisted extractor: context first, then the reply
    /// format, then the capability list in name order.
    pub fn build_system_prompt(&self, context_string: &str) -> String {
        let mut prompt = String::new();

        if !context_string.is_empty() {
            prompt.push_str(context_string);
            prompt.push_str(
                "When the user refers to \"that folder\", \"that file\" or \"there\", \
                 use the matching value above instead of inventing one.\n\n",
            );
        }

        prompt.push_str(
            "You are ORION. Map the user's request to exactly one function call.\n\
             Reply with JSON only, in this shape:\n\
             {\"CALL\": \"function_name\", \"ARGS\": {\"arg\": \"value\"}}\n\
             If no function applies, reply {\"CALL\": null, \"ARGS\": {}}.\n\n\
             Available functions:\n",
        );

        for schema in self.list() {
            prompt.push_str(&format!("- {}: {}\n", schema.signature(), schema.description));
        }

        prompt.push_str(
            "\nExamples:\n\
             User: \"create folder projects\"\n\
             {\"CALL\": \"create_folder\", \"ARGS\": {\"path\": \"projects\"}}\n\
             User: \"my favorite color is red\"\n\
             {\"CALL\": \"set_preference\", \"ARGS\": {\"key\": \"favorite_color\", \"value\": \"red\"}}\n",
        );

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CapabilityContext;
    use async_trait::async_trait;
    use orion_core::{ArgSchema, ArgType, Args, Result};
    use serde_json::Value;

    struct Named(&'static str, &'static str);

    #[async_trait]
    impl Capability for Named {
        fn schema(&self) -> CapabilitySchema {
            CapabilitySchema::new(
                self.0,
                self.1,
                ArgSchema::new().required("path", ArgType::String),
            )
        }

        async fn execute(&self, _ctx: CapabilityContext, _args: Args) -> Result<Value> {
            Ok(Value::String(self.1.to_string()))
        }
    }

    #[test]
    fn test_builtins_registered() {
        let registry = CapabilityRegistry::with_builtins();
        for name in [
            "create_folder",
            "create_file",
            "list_files",
            "download_file",
            "convert_csv_to_json",
            "analyze_data",
            "get_capabilities",
            "set_preference",
            "get_preference",
        ] {
            assert!(registry.contains(name), "missing builtin {}", name);
        }
        assert_eq!(registry.len(), 9);
    }

    #[test]
    fn test_last_writer_wins() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(Named("echo", "first")));
        registry.register(Arc::new(Named("echo", "second")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.schema("echo").unwrap().description, "second");
    }

    #[test]
    fn test_retract_only_current_owner() {
        let mut registry = CapabilityRegistry::new();
        registry.register_owned(Arc::new(Named("a", "from p1")), "p1");
        registry.register_owned(Arc::new(Named("b", "from p1")), "p1");
        // p2 overwrites b, so p1 no longer owns it
        registry.register_owned(Arc::new(Named("b", "from p2")), "p2");

        let removed = registry.retract_owner("p1");
        assert_eq!(removed, vec!["a".to_string()]);
        assert!(registry.contains("b"));
        assert_eq!(registry.owner("b"), Some("p2"));
    }

    #[test]
    fn test_prompt_is_sorted_and_stable() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(Named("zeta", "last")));
        registry.register(Arc::new(Named("alpha", "first")));
        let prompt = registry.build_system_prompt("");
        let alpha = prompt.find("- alpha(path: string)").unwrap();
        let zeta = prompt.find("- zeta(path: string)").unwrap();
        assert!(alpha < zeta);
        assert_eq!(prompt, registry.build_system_prompt(""));
        assert!(!prompt.contains("that folder"));

        let with_ctx = registry.build_system_prompt("Current context:\n- last_folder: proj\n");
        assert!(with_ctx.starts_with("Current context:"));
    }
}
