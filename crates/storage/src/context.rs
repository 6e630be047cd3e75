use chrono::Utc;
use orion_core::{normalize_path, Args, Error, Result};
use rusqlite::params;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tracing::debug;

use crate::db::{storage_err, Database};

pub const SLOT_LAST_FOLDER: &str = "last_folder";
pub const SLOT_LAST_FILE: &str = "last_file";
pub const SLOT_LAST_ACTION: &str = "last_action";

const DEFAULT_SLOTS: &[&str] = &[SLOT_LAST_FOLDER, SLOT_LAST_FILE, SLOT_LAST_ACTION];

/// (capability, argument, slot): a successful call to `capability` stores the
/// normalized value of `argument` into `slot`.
const INFERENCE_TABLE: &[(&str, &str, &str)] = &[
    ("create_folder", "path", SLOT_LAST_FOLDER),
    ("list_files", "path", SLOT_LAST_FOLDER),
    ("create_file", "path", SLOT_LAST_FILE),
    ("download_file", "output_path", SLOT_LAST_FILE),
    ("convert_csv_to_json", "output_path", SLOT_LAST_FILE),
    ("analyze_data", "output_path", SLOT_LAST_FILE),
];

struct ContextState {
    /// Slot names in registration order.
    slots: Vec<String>,
    values: HashMap<String, String>,
}

impl ContextState {
    fn has_slot(&self, key: &str) -> bool {
        self.slots.iter().any(|s| s == key)
    }
}

/// Short-term conversational memory with a write-through SQLite backing.
///
/// Every mutation is persisted before the call returns; the in-memory lock
/// is held across the write so concurrent read-modify-write sequences on
/// the same store serialize.
pub struct ContextStore {
    db: Database,
    state: Mutex<ContextState>,
}

impl ContextStore {
    /// Load the default slots, plus any persisted keys, from `db`.
    pub fn load(db: Database) -> Result<Self> {
        let mut slots: Vec<String> = DEFAULT_SLOTS.iter().map(|s| s.to_string()).collect();
        let mut values = HashMap::new();

        {
            let conn = db.conn()?;
            let mut stmt = conn
                .prepare("SELECT key, value FROM context ORDER BY key")
                .map_err(storage_err("Failed to read context"))?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
                .map_err(storage_err("Failed to read context"))?;
            for row in rows {
                let (key, value) = row.map_err(storage_err("Failed to read context row"))?;
                if !slots.contains(&key) {
                    slots.push(key.clone());
                }
                values.insert(key, value);
            }
        }

        debug!(loaded = values.len(), "Context loaded");
        Ok(Self {
            db,
            state: Mutex::new(ContextState { slots, values }),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ContextState>> {
        self.state
            .lock()
            .map_err(|e| Error::Storage(format!("Context lock error: {}", e)))
    }

    /// Add a new slot. Registering an existing slot is a no-op.
    pub fn register_slot(&self, key: &str) -> Result<()> {
        let mut state = self.lock()?;
        if !state.has_slot(key) {
            state.slots.push(key.to_string());
        }
        Ok(())
    }

    pub fn slots(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.slots.clone())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.values.get(key).cloned())
    }

    /// Current value of every slot, empty slots included.
    pub fn snapshot(&self) -> Result<BTreeMap<String, Option<String>>> {
        let state = self.lock()?;
        Ok(state
            .slots
            .iter()
            .map(|slot| (slot.clone(), state.values.get(slot).cloned()))
            .collect())
    }

    /// Set or clear one slot and persist it. Unknown slots are rejected.
    pub fn update(&self, key: &str, value: Option<&str>) -> Result<()> {
        let mut state = self.lock()?;
        if !state.has_slot(key) {
            return Err(Error::Validation(format!("Unknown context slot: {}", key)));
        }
        self.write(&mut state, key, value)
    }

    /// Apply the effects of a successful capability call.
    pub fn infer_update(&self, call: &str, args: &Args) -> Result<()> {
        let mut state = self.lock()?;
        for (capability, arg, slot) in INFERENCE_TABLE {
            if *capability != call {
                continue;
            }
            if let Some(value) = args.get(*arg).and_then(|v| v.as_str()) {
                let normalized = normalize_path(value);
                self.write(&mut state, slot, Some(&normalized))?;
            }
        }
        self.write(&mut state, SLOT_LAST_ACTION, Some(call))
    }

    /// Empty every slot, in memory and on disk.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.lock()?;
        let conn = self.db.conn()?;
        conn.execute("DELETE FROM context", [])
            .map_err(storage_err("Failed to clear context"))?;
        state.values.clear();
        debug!("Context cleared");
        Ok(())
    }

    /// Non-empty slots rendered for a model prompt; empty string when nothing is set.
    pub fn context_string(&self) -> Result<String> {
        let state = self.lock()?;
        let lines: Vec<String> = state
            .slots
            .iter()
            .filter_map(|slot| {
                state
                    .values
                    .get(slot)
                    .filter(|v| !v.is_empty())
                    .map(|v| format!("- {}: {}", slot, v))
            })
            .collect();
        if lines.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("Current context:\n{}\n", lines.join("\n")))
    }

    fn write(&self, state: &mut ContextState, key: &str, value: Option<&str>) -> Result<()> {
        let conn = self.db.conn()?;
        match value {
            Some(v) => {
                conn.execute(
                    "INSERT OR REPLACE INTO context (key, value, updated_at) VALUES (?1, ?2, ?3)",
                    params![key, v, Utc::now().to_rfc3339()],
                )
                .map_err(storage_err("Failed to persist context"))?;
                state.values.insert(key.to_string(), v.to_string());
            }
            None => {
                conn.execute("DELETE FROM context WHERE key = ?1", params![key])
                    .map_err(storage_err("Failed to persist context"))?;
                state.values.remove(key);
            }
        }
        debug!(key, value = ?value, "Context updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn args(value: serde_json::Value) -> Args {
        value.as_object().cloned().unwrap()
    }

    fn open(dir: &TempDir) -> ContextStore {
        let db = Database::open(&dir.path().join("orion.db")).unwrap();
        ContextStore::load(db).unwrap()
    }

    #[test]
    fn test_defaults_are_empty() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let snap = store.snapshot().unwrap();
        assert_eq!(snap.len(), 3);
        assert!(snap.values().all(|v| v.is_none()));
        assert_eq!(store.context_string().unwrap(), "");
    }

    #[test]
    fn test_create_folder_survives_reload() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store
            .infer_update("create_folder", &args(json!({"path": "proj"})))
            .unwrap();
        assert_eq!(store.get(SLOT_LAST_FOLDER).unwrap().as_deref(), Some("proj"));
        drop(store);

        let fresh = open(&dir);
        assert_eq!(fresh.get(SLOT_LAST_FOLDER).unwrap().as_deref(), Some("proj"));
        assert_eq!(fresh.get(SLOT_LAST_ACTION).unwrap().as_deref(), Some("create_folder"));
    }

    #[test]
    fn test_infer_update_normalizes_and_maps_slots() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store
            .infer_update("convert_csv_to_json", &args(json!({"input_path": "a.csv", "output_path": ".//out\\a.json"})))
            .unwrap();
        assert_eq!(store.get(SLOT_LAST_FILE).unwrap().as_deref(), Some("out/a.json"));
        assert_eq!(store.get(SLOT_LAST_FOLDER).unwrap(), None);
    }

    #[test]
    fn test_missing_argument_leaves_slot_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.update(SLOT_LAST_FOLDER, Some("docs")).unwrap();
        store.infer_update("list_files", &args(json!({}))).unwrap();
        assert_eq!(store.get(SLOT_LAST_FOLDER).unwrap().as_deref(), Some("docs"));
        assert_eq!(store.get(SLOT_LAST_ACTION).unwrap().as_deref(), Some("list_files"));
    }

    #[test]
    fn test_unknown_slot_rejected_until_registered() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        assert!(matches!(
            store.update("last_url", Some("http://x")),
            Err(Error::Validation(_))
        ));
        store.register_slot("last_url").unwrap();
        store.update("last_url", Some("http://x")).unwrap();

        let fresh = open(&dir);
        assert_eq!(fresh.get("last_url").unwrap().as_deref(), Some("http://x"));
        assert!(fresh.slots().unwrap().contains(&"last_url".to_string()));
    }

    #[test]
    fn test_clear_and_none_remove_rows() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.update(SLOT_LAST_FILE, Some("a.txt")).unwrap();
        store.update(SLOT_LAST_FILE, None).unwrap();
        assert_eq!(open(&dir).get(SLOT_LAST_FILE).unwrap(), None);

        store.update(SLOT_LAST_FOLDER, Some("x")).unwrap();
        store.clear().unwrap();
        assert_eq!(store.get(SLOT_LAST_FOLDER).unwrap(), None);
        assert_eq!(open(&dir).get(SLOT_LAST_FOLDER).unwrap(), None);
    }

    #[test]
    fn test_context_string_lists_set_slots() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.update(SLOT_LAST_FOLDER, Some("proj")).unwrap();
        let text = store.context_string().unwrap();
        assert!(text.contains("- last_folder: proj"));
        assert!(!text.contains("last_file"));
    }
}
