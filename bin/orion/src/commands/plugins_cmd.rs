use orion_core::{Config, Paths};
use orion_plugins::{PluginCatalog, PluginManager};
use orion_tools::CapabilityRegistry;

use super::open_session;

/// Load plugins the way a session does and print their state.
pub fn list(paths: &Paths) -> anyhow::Result<()> {
    let session = open_session(paths)?;
    let plugins = session.plugins.list();
    let discovered = session.plugins.discover();

    println!();
    println!("Plugins ({} loaded)", session.plugins.enabled_names().len());
    println!();
    for plugin in &plugins {
        println!(
            "  {:<18} v{:<8} {:<9} {}",
            plugin.name,
            plugin.version,
            plugin.state(),
            plugin.description
        );
        if !plugin.capabilities.is_empty() {
            println!("     capabilities: {}", plugin.capabilities.join(", "));
        }
        if let Some(err) = &plugin.last_error {
            println!("     error: {}", err);
        }
    }
    for name in discovered
        .iter()
        .filter(|n| !plugins.iter().any(|p| &p.name == *n))
    {
        println!("  {:<18} (not loaded)", name);
    }
    if plugins.is_empty() && discovered.is_empty() {
        println!("  (no plugins found)");
    }
    println!();

    session.close();
    Ok(())
}

/// Print discovered plugin directories without loading anything.
pub fn discover(paths: &Paths) -> anyhow::Result<()> {
    let config = Config::load_or_default(paths)?;
    let manager = PluginManager::new(
        config.plugin_dirs(paths),
        PluginCatalog::builtin(),
        CapabilityRegistry::new().into_shared(),
    );

    println!();
    println!("Plugin roots:");
    for dir in manager.plugin_dirs() {
        let marker = if dir.is_dir() { "" } else { " (missing)" };
        println!("  {}{}", dir.display(), marker);
    }
    println!();
    let names = manager.discover();
    println!("Discovered ({}):", names.len());
    for name in names {
        println!("  {}", name);
    }
    println!();
    Ok(())
}
