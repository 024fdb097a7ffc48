use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{helpers::parse_datetime, models::NotifiedAssignment, Database};

fn row_to_notified(row: &Row) -> Result<NotifiedAssignment> {
    let notified_at: String = row.get("notified_at")?;
    let delivered: i64 = row.get("delivered")?;

    Ok(NotifiedAssignment {
        id: row.get("id")?,
        client_name: row.get("client_name")?,
        scheduled_time: row.get("scheduled_time")?,
        delivered: delivered != 0,
        notified_at: parse_datetime(&notified_at, "notified_at")?,
    })
}

impl Database {
    /// Append an entry. The first entry for an id wins; later ones are
    /// ignored.
    pub async fn record_notified(&self, entry: &NotifiedAssignment) -> Result<()> {
        let entry = entry.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO notified_assignments
                     (id, client_name, scheduled_time, delivered, notified_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.id,
                    entry.client_name,
                    entry.scheduled_time,
                    entry.delivered as i64,
                    entry.notified_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn load_notified_ids(&self) -> Result<Vec<String>> {
        self.execute(|conn| {
            let mut stmt =
                conn.prepare("SELECT id FROM notified_assignments ORDER BY notified_at ASC")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
        .await
    }

    pub async fn recent_notified(&self, limit: usize) -> Result<Vec<NotifiedAssignment>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, client_name, scheduled_time, delivered, notified_at
                 FROM notified_assignments
                 ORDER BY notified_at DESC
                 LIMIT ?1",
            )?;
            let mut rows = stmt.query(params![limit])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(row_to_notified(row)?);
            }
            Ok(entries)
        })
        .await
    }
}
