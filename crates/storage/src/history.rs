use chrono::Utc;
use orion_core::Result;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::{storage_err, Database};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub command: String,
    pub result: String,
    pub timestamp: String,
}

/// Append-only log of resolved commands.
#[derive(Clone)]
pub struct HistoryLog {
    db: Database,
}

impl HistoryLog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn append(&self, command: &str, result: &str) -> Result<i64> {
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO history (command, result, timestamp) VALUES (?1, ?2, ?3)",
            params![command, result, Utc::now().to_rfc3339()],
        )
        .map_err(storage_err("Failed to append history"))?;
        let id = conn.last_insert_rowid();
        debug!(id, command, "History entry appended");
        Ok(id)
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let conn = self.db.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, command, result, timestamp FROM history ORDER BY id DESC LIMIT ?1",
            )
            .map_err(storage_err("Failed to query history"))?;
        let rows = stmt
            .query_map(params![limit as i64], row_to_entry)
            .map_err(storage_err("Failed to query history"))?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(storage_err("Failed to read history row"))?);
        }
        Ok(entries)
    }

    pub fn last(&self) -> Result<Option<HistoryEntry>> {
        let conn = self.db.conn()?;
        let entry = conn
            .query_row(
                "SELECT id, command, result, timestamp FROM history ORDER BY id DESC LIMIT 1",
                [],
                row_to_entry,
            )
            .optional()
            .map_err(storage_err("Failed to query history"))?;
        Ok(entry)
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.db.conn()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))
            .map_err(storage_err("Failed to count history"))?;
        Ok(n as usize)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryEntry> {
    Ok(HistoryEntry {
        id: row.get(0)?,
        command: row.get(1)?,
        result: row.get(2)?,
        timestamp: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn log() -> (HistoryLog, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("orion.db")).unwrap();
        (HistoryLog::new(db), dir)
    }

    #[test]
    fn test_empty_log() {
        let (log, _dir) = log();
        assert!(log.last().unwrap().is_none());
        assert!(log.recent(5).unwrap().is_empty());
        assert_eq!(log.count().unwrap(), 0);
    }

    #[test]
    fn test_append_and_recent_order() {
        let (log, _dir) = log();
        log.append("crear carpeta a", "[ok] created a").unwrap();
        log.append("listar a", "[ok] 0 entries").unwrap();
        log.append("borrar todo", "[not_found] nope").unwrap();

        let recent = log.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].command, "borrar todo");
        assert_eq!(recent[1].command, "listar a");
        assert_eq!(log.last().unwrap().unwrap().result, "[not_found] nope");
        assert_eq!(log.count().unwrap(), 3);
    }
}
