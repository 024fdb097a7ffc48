use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::db::NotifiedAssignment;
use crate::models::AssignmentRecord;

/// What one poll cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub cycle: u64,
    pub found: usize,
    pub new: usize,
    pub notified: usize,
    pub failed: usize,
    pub strategy: Option<String>,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycle {}: found={} new={} notified={} failed={} strategy={}",
            self.cycle,
            self.found,
            self.new,
            self.notified,
            self.failed,
            self.strategy.as_deref().unwrap_or("none")
        )
    }
}

/// Plain-text listing used by the one-shot dump command.
pub fn format_dump(records: &[AssignmentRecord]) -> String {
    if records.is_empty() {
        return "No assignments found.\n".to_string();
    }
    let mut out = format!("Found {} assignments\n", records.len());
    for (index, record) in records.iter().enumerate() {
        out.push_str(&format!(
            "\n[{}] {}\n  Client:   {}\n  Time:     {}\n  Duration: {}\n  Location: {}\n",
            index + 1,
            record.id,
            record.client_name,
            record.scheduled_time,
            record.duration,
            record.location,
        ));
    }
    out
}

/// Seen-journal entries, newest first, one per line.
pub fn format_history(journal: &Path, entries: &[NotifiedAssignment]) -> String {
    if entries.is_empty() {
        return format!("Seen journal {} is empty.\n", journal.display());
    }
    let mut out = format!(
        "Last {} notifications in {}\n",
        entries.len(),
        journal.display()
    );
    for entry in entries {
        out.push_str(&format!(
            "{} {:<6} {}  {} at {}\n",
            entry.notified_at.format("%Y-%m-%d %H:%M:%S"),
            if entry.delivered { "sent" } else { "failed" },
            entry.id,
            entry.client_name,
            entry.scheduled_time,
        ));
    }
    out
}
