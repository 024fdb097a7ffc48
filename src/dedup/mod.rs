//! Identity memory: which assignments already had a notification attempt.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::db::{Database, NotifiedAssignment};
use crate::models::AssignmentRecord;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Durable log of notified ids, so a restart does not replay alerts.
#[async_trait]
pub trait SeenJournal: Send + Sync {
    async fn load(&self) -> Result<Vec<String>>;

    async fn remember(&self, record: &AssignmentRecord, delivered: bool) -> Result<()>;
}

pub struct SqliteJournal {
    db: Database,
}

impl SqliteJournal {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SeenJournal for SqliteJournal {
    async fn load(&self) -> Result<Vec<String>> {
        self.db.load_notified_ids().await
    }

    async fn remember(&self, record: &AssignmentRecord, delivered: bool) -> Result<()> {
        self.db
            .record_notified(&NotifiedAssignment::from_record(record, delivered))
            .await
    }
}

/// Grows for the lifetime of the process and is never pruned. Owned by the
/// poll loop; not shared.
#[derive(Default)]
pub struct DedupStore {
    seen: HashSet<String>,
    journal: Option<Box<dyn SeenJournal>>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load every id the journal knows about. A journal that cannot be
    /// read still gets appended to; the store just starts empty.
    pub async fn with_journal(journal: Box<dyn SeenJournal>) -> Self {
        let seen = match journal.load().await {
            Ok(ids) => {
                log_info!("Loaded {} previously notified ids", ids.len());
                ids.into_iter().collect()
            }
            Err(err) => {
                log_warn!("Seen journal unreadable, starting empty: {err:#}");
                HashSet::new()
            }
        };
        Self {
            seen,
            journal: Some(journal),
        }
    }

    pub fn is_new(&self, id: &str) -> bool {
        !self.seen.contains(id)
    }

    pub fn mark_seen(&mut self, id: &str) {
        self.seen.insert(id.to_string());
    }

    /// Mark `record` seen after its notification attempt sequence and append
    /// it to the journal when one is attached.
    pub async fn record_attempt(&mut self, record: &AssignmentRecord, delivered: bool) {
        self.mark_seen(&record.id);
        if let Some(journal) = &self.journal {
            if let Err(err) = journal.remember(record, delivered).await {
                log_warn!("Failed to journal {}: {err:#}", record.id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
