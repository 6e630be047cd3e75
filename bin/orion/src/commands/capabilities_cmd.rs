use orion_core::Paths;

use super::open_session;

/// Print every registered capability with its signature and owner.
pub fn list(paths: &Paths) -> anyhow::Result<()> {
    let session = open_session(paths)?;
    {
        let registry = session
            .registry
            .read()
            .map_err(|e| anyhow::anyhow!("Registry lock error: {}", e))?;
        let schemas = registry.list();

        println!();
        println!("Capabilities ({} total)", schemas.len());
        println!();
        for schema in &schemas {
            let owner = registry.owner(&schema.name).unwrap_or("built-in");
            println!("  {}", schema.signature());
            println!("     {} [{}]", schema.description, owner);
        }
        println!();
    }
    session.close();
    Ok(())
}
