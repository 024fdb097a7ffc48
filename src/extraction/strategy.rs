use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::browser::Browser;
use crate::models::RawRecord;
use crate::utils::normalize_ws;

use super::mapping::{map_cells, Cell, MARKER_ATTRIBUTES, ROW_ID_ATTRIBUTES};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// One self-contained way of finding assignment rows on the page.
///
/// `Ok(None)` means "nothing usable here"; errors mean the strategy could not
/// even look. The chain treats both as a reason to move on.
#[async_trait]
pub trait ExtractionStrategy<B: Browser>: Send + Sync {
    fn name(&self) -> &str;

    async fn try_extract(&self, browser: &B) -> Result<Option<Vec<RawRecord>>>;
}

/// Container, row and cell selectors for a grid-shaped layout.
#[derive(Debug, Clone)]
pub struct GridStrategy {
    name: String,
    container: String,
    row: String,
    cell: String,
}

impl GridStrategy {
    pub fn new(
        name: impl Into<String>,
        container: impl Into<String>,
        row: impl Into<String>,
        cell: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            container: container.into(),
            row: row.into(),
            cell: cell.into(),
        }
    }

    async fn read_row<B: Browser>(&self, browser: &B, row: &B::Element) -> Result<RawRecord> {
        let row_id = first_attribute(browser, row, ROW_ID_ATTRIBUTES)
            .await?
            .map(|id| normalize_ws(&id))
            .filter(|id| !id.is_empty());

        let mut cells = Vec::new();
        for element in browser
            .find_all(&self.cell, Some(row))
            .await
            .with_context(|| format!("cells of row via {}", self.cell))?
        {
            let text = normalize_ws(&browser.read_text(&element).await?);
            let marker = first_attribute(browser, &element, MARKER_ATTRIBUTES).await?;
            cells.push(Cell { text, marker });
        }

        let fields = map_cells(&cells);
        Ok(RawRecord {
            row_id: row_id.or(fields.row_id),
            client_name: fields.client_name,
            scheduled_time: fields.scheduled_time,
            duration: fields.duration,
            location: fields.location,
            cells: cells.into_iter().map(|c| c.text).collect(),
            sequence: 0,
        })
    }
}

#[async_trait]
impl<B: Browser> ExtractionStrategy<B> for GridStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn try_extract(&self, browser: &B) -> Result<Option<Vec<RawRecord>>> {
        let Some(container) = browser
            .find(&self.container, None)
            .await
            .with_context(|| format!("container lookup {}", self.container))?
        else {
            return Ok(None);
        };

        let rows = browser
            .find_all(&self.row, Some(&container))
            .await
            .with_context(|| format!("row lookup {}", self.row))?;
        log_debug!("{}: {} candidate rows", self.name, rows.len());

        let mut records = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            match self.read_row(browser, row).await {
                Ok(record) if record.is_minimally_populated() => records.push(record),
                Ok(_) => log_debug!("{}: row {index} has no client or schedule", self.name),
                Err(err) => log_debug!("{}: skipping row {index}: {err:#}", self.name),
            }
        }

        Ok((!records.is_empty()).then_some(records))
    }
}

async fn first_attribute<B: Browser>(
    browser: &B,
    element: &B::Element,
    names: &[&str],
) -> Result<Option<String>> {
    for name in names {
        if let Some(value) = browser.read_attribute(element, name).await? {
            if !value.trim().is_empty() {
                return Ok(Some(value));
            }
        }
    }
    Ok(None)
}
