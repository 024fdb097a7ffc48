//! Locating and parsing assignment rows on the jobs page.

pub mod chain;
pub mod mapping;
pub mod strategy;
pub mod tabs;

use std::time::Duration;

use anyhow::{Context, Result};

use crate::browser::{find_first, wait_until, Browser};
use crate::diagnostics::DiagnosticsCollector;
use crate::models::AssignmentRecord;
use crate::normalize::normalize;
use crate::settings::Settings;

pub use chain::{default_grid_strategies, ChainOutcome, StrategyChain};
pub use mapping::{map_cells, Cell, MappedFields};
pub use strategy::{ExtractionStrategy, GridStrategy};
pub use tabs::select_open_jobs_tab;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Anything that indicates the job grid has rendered.
pub const GRID_READY_SELECTORS: &[&str] = &[
    ".ag-center-cols-container",
    ".ag-body-viewport",
    "[role='grid']",
    "table",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub strategy: Option<String>,
    pub records: Vec<AssignmentRecord>,
}

pub struct JobExtractor<B: Browser> {
    jobs_url: String,
    chain: StrategyChain<B>,
    diagnostics: DiagnosticsCollector,
    wait_timeout: Duration,
    wait_poll: Duration,
}

impl<B: Browser> JobExtractor<B> {
    pub fn new(
        jobs_url: impl Into<String>,
        chain: StrategyChain<B>,
        diagnostics: DiagnosticsCollector,
        wait_timeout: Duration,
        wait_poll: Duration,
    ) -> Self {
        Self {
            jobs_url: jobs_url.into(),
            chain,
            diagnostics,
            wait_timeout,
            wait_poll,
        }
    }

    pub fn from_settings(settings: &Settings, diagnostics: DiagnosticsCollector) -> Self {
        Self::new(
            settings.site.jobs_url.clone(),
            StrategyChain::with_default_strategies(),
            diagnostics,
            settings.wait_timeout(),
            settings.wait_poll(),
        )
    }

    /// Open the jobs view and return every usable row, normalized, in page
    /// order. Only a failure to reach the jobs page is an error; everything
    /// past that degrades to fewer (or zero) records.
    pub async fn extract(&self, browser: &B) -> Result<Extraction> {
        browser
            .navigate(&self.jobs_url)
            .await
            .with_context(|| format!("cannot open jobs page {}", self.jobs_url))?;

        select_open_jobs_tab(browser).await;

        let ready = wait_until(self.wait_timeout, self.wait_poll, move || async move {
            find_first(browser, GRID_READY_SELECTORS, None).await.map(|_| ())
        })
        .await;
        if ready.is_err() {
            log_warn!(
                "Job grid not visible after {}ms, trying strategies anyway",
                self.wait_timeout.as_millis()
            );
        }

        let outcome = self.chain.run(browser).await;
        if outcome.records.is_empty() {
            self.diagnostics.capture(browser, "no_jobs_found").await;
        }

        let records: Vec<AssignmentRecord> = outcome.records.iter().map(normalize).collect();
        log_info!("Extracted {} assignments", records.len());
        Ok(Extraction {
            strategy: outcome.strategy,
            records,
        })
    }
}
