pub mod context;
pub mod db;
pub mod history;
pub mod preferences;

pub use context::{ContextStore, SLOT_LAST_ACTION, SLOT_LAST_FILE, SLOT_LAST_FOLDER};
pub use db::Database;
pub use history::{HistoryEntry, HistoryLog};
pub use preferences::PreferenceStore;
