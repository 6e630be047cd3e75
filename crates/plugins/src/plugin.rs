use orion_core::Result;
use orion_tools::{Capability, CapabilityRegistry};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Capability provider that can be loaded, toggled and unloaded at runtime.
///
/// Lifecycle, as driven by `PluginManager`:
/// `configure` → `initialize` → `register_capabilities` → `on_enable`
/// → (`on_disable` ⇄ `on_enable`)* → `on_disable` → `shutdown`.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
    fn version(&self) -> &str;
    fn description(&self) -> &str;

    fn author(&self) -> &str {
        "Unknown"
    }

    /// External binaries the plugin needs on `PATH`.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Receives the `config` map of the plugin definition before `initialize`.
    fn configure(&mut self, _config: &Map<String, Value>) {}

    /// Readiness check; an error keeps the plugin from loading.
    fn initialize(&mut self) -> Result<()>;

    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_enable(&mut self) {}

    fn on_disable(&mut self) {}

    fn register_capabilities(&self, registrar: &mut PluginRegistrar<'_>);
}

/// Write access to the registry on behalf of one plugin; every entry it
/// registers is tagged with that plugin as owner.
pub struct PluginRegistrar<'a> {
    registry: &'a mut CapabilityRegistry,
    owner: &'a str,
    registered: Vec<String>,
}

impl<'a> PluginRegistrar<'a> {
    pub fn new(registry: &'a mut CapabilityRegistry, owner: &'a str) -> Self {
        Self {
            registry,
            owner,
            registered: Vec::new(),
        }
    }

    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.registered.push(capability.schema().name);
        self.registry.register_owned(capability, self.owner);
    }

    pub fn registered(&self) -> &[String] {
        &self.registered
    }

    pub fn into_registered(self) -> Vec<String> {
        self.registered
    }
}
