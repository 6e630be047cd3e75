use orion_core::{Config, Paths};

/// Show the effective configuration as pretty-printed JSON.
pub fn show(paths: &Paths) -> anyhow::Result<()> {
    let config = Config::load_or_default(paths)?;
    let file = paths.config_file();

    println!();
    println!("Configuration");
    if file.exists() {
        println!("  File: {}", file.display());
    } else {
        println!("  File: {} (not created, showing defaults)", file.display());
    }
    println!("  Database: {}", config.database_path(paths).display());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Write the default configuration; refuses to overwrite without `force`.
pub fn init(paths: &Paths, force: bool) -> anyhow::Result<()> {
    let file = paths.config_file();
    if file.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            file.display()
        );
    }
    paths.ensure_dirs()?;
    Config::default().save(&file)?;
    println!("Configuration written to {}", file.display());
    Ok(())
}
