use orion_core::Paths;
use orion_storage::ContextStore;

use super::open_database;

pub fn show(paths: &Paths) -> anyhow::Result<()> {
    let context = ContextStore::load(open_database(paths)?)?;
    println!();
    println!("Context");
    for (slot, value) in context.snapshot()? {
        println!("  {:<14} {}", slot, value.as_deref().unwrap_or("-"));
    }
    println!();
    Ok(())
}

pub fn clear(paths: &Paths) -> anyhow::Result<()> {
    let context = ContextStore::load(open_database(paths)?)?;
    context.clear()?;
    println!("Context cleared.");
    Ok(())
}
