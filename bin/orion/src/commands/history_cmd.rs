use orion_core::Paths;
use orion_storage::HistoryLog;

use super::open_database;

/// Print the most recent commands, oldest first.
pub fn show(paths: &Paths, limit: usize) -> anyhow::Result<()> {
    let history = HistoryLog::new(open_database(paths)?);
    let mut entries = history.recent(limit)?;
    entries.reverse();

    println!();
    if entries.is_empty() {
        println!("(No history yet)");
    }
    for entry in entries {
        println!("  [{}] {}", entry.timestamp, entry.command);
        println!("     -> {}", entry.result);
    }
    println!();
    Ok(())
}
