use serde::{Deserialize, Serialize};

pub const UNKNOWN_CLIENT: &str = "Unknown Client";

/// Canonical view of one discoverable job. Built fresh from live page state
/// on every extraction pass and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    pub id: String,
    pub client_name: String,
    pub scheduled_time: String,
    pub duration: String,
    pub location: String,
    pub description: String,
    pub id_source: IdSource,
}

/// Where a record's `id` came from, most stable first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdSource {
    /// Identifier exposed by the page (row attribute or id column).
    Page,
    /// Hash of the normalized row text. Changes if any visible cell changes.
    RowHash,
    /// Per-pass counter. Not stable across passes.
    Synthetic,
}

impl IdSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdSource::Page => "page",
            IdSource::RowHash => "hash",
            IdSource::Synthetic => "synthetic",
        }
    }
}

/// Partial output of one extraction strategy for one row. Any field may be
/// missing; the normalizer fills the canonical defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub row_id: Option<String>,
    pub client_name: Option<String>,
    pub scheduled_time: Option<String>,
    pub duration: Option<String>,
    pub location: Option<String>,
    /// Whitespace-collapsed text of every cell, in DOM order.
    pub cells: Vec<String>,
    /// Process-wide sequence number assigned at extraction time; only used for
    /// the synthetic id fallback.
    pub sequence: u64,
}

impl RawRecord {
    /// A row is usable when it carries either client identity or schedule text.
    pub fn is_minimally_populated(&self) -> bool {
        has_text(&self.client_name) || has_text(&self.scheduled_time)
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}
