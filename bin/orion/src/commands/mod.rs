pub mod capabilities_cmd;
pub mod chat;
pub mod config_cmd;
pub mod context_cmd;
pub mod history_cmd;
pub mod plugins_cmd;
pub mod render;
pub mod run_cmd;

use orion_agent::Session;
use orion_core::{Config, Paths};
use orion_storage::Database;

/// Load the configuration and open a full session (plugins included).
pub fn open_session(paths: &Paths) -> anyhow::Result<Session> {
    let config = Config::load_or_default(paths)?;
    Ok(Session::open(paths, config)?)
}

/// Open only the database, for commands that do not dispatch anything.
pub fn open_database(paths: &Paths) -> anyhow::Result<Database> {
    let config = Config::load_or_default(paths)?;
    Ok(Database::open(&config.database_path(paths))?)
}
