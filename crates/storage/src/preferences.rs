use chrono::Utc;
use orion_core::Result;
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use crate::db::{storage_err, Database};

/// Durable user preferences (key/value).
#[derive(Clone)]
pub struct PreferenceStore {
    db: Database,
}

impl PreferenceStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().to_rfc3339()],
        )
        .map_err(storage_err("Failed to save preference"))?;
        debug!(key, "Preference saved");
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.db.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_err("Failed to read preference"))?;
        Ok(value)
    }

    pub fn all(&self) -> Result<Vec<(String, String)>> {
        let conn = self.db.conn()?;
        let mut stmt = conn
            .prepare("SELECT key, value FROM preferences ORDER BY key")
            .map_err(storage_err("Failed to read preferences"))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(storage_err("Failed to read preferences"))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(storage_err("Failed to read preference row"))?);
        }
        Ok(out)
    }
}
