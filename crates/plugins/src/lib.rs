pub mod builtin;
pub mod catalog;
pub mod manager;
pub mod manifest;
pub mod plugin;

pub use catalog::{PluginCatalog, PluginFactory};
pub use manager::{LoadReport, PluginDescriptor, PluginError, PluginManager, PluginState};
pub use manifest::{PluginDefinition, PluginMeta, DEFINITION_FILE, META_FILE};
pub use plugin::{Plugin, PluginRegistrar};
