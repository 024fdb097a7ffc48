use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::AssignmentRecord;

/// One row of the seen journal: an assignment a notification was attempted
/// for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifiedAssignment {
    pub id: String,
    pub client_name: String,
    pub scheduled_time: String,
    pub delivered: bool,
    pub notified_at: DateTime<Utc>,
}

impl NotifiedAssignment {
    pub fn from_record(record: &AssignmentRecord, delivered: bool) -> Self {
        Self {
            id: record.id.clone(),
            client_name: record.client_name.clone(),
            scheduled_time: record.scheduled_time.clone(),
            delivered,
            notified_at: Utc::now(),
        }
    }
}
