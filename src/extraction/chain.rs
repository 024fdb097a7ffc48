use std::sync::atomic::{AtomicU64, Ordering};

use crate::browser::Browser;
use crate::models::RawRecord;

use super::strategy::{ExtractionStrategy, GridStrategy};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Feeds the synthetic id fallback. Process-wide so two passes never hand out
/// the same synthetic id.
static ROW_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Rows from the first strategy that produced any, tagged with its name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainOutcome {
    pub strategy: Option<String>,
    pub records: Vec<RawRecord>,
}

/// Ordered list of strategies, tried first to last until one yields rows.
pub struct StrategyChain<B: Browser> {
    strategies: Vec<Box<dyn ExtractionStrategy<B>>>,
}

impl<B: Browser> StrategyChain<B> {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy<B>>>) -> Self {
        Self { strategies }
    }

    /// Structurally specific layouts first, generic grid-ish markup last.
    pub fn with_default_strategies() -> Self {
        Self::new(
            default_grid_strategies()
                .into_iter()
                .map(|s| Box::new(s) as Box<dyn ExtractionStrategy<B>>)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub async fn run(&self, browser: &B) -> ChainOutcome {
        for strategy in &self.strategies {
            match strategy.try_extract(browser).await {
                Ok(Some(mut records)) if !records.is_empty() => {
                    for record in &mut records {
                        record.sequence = ROW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
                    }
                    log_info!(
                        "Strategy {} found {} assignment rows",
                        strategy.name(),
                        records.len()
                    );
                    return ChainOutcome {
                        strategy: Some(strategy.name().to_string()),
                        records,
                    };
                }
                Ok(_) => log_info!("Strategy {} found nothing", strategy.name()),
                Err(err) => log_warn!("Strategy {} failed: {err:#}", strategy.name()),
            }
        }
        log_warn!("No extraction strategy produced rows");
        ChainOutcome::default()
    }
}

pub fn default_grid_strategies() -> Vec<GridStrategy> {
    vec![
        GridStrategy::new(
            "ag-grid-component",
            "ag-grid-angular .ag-body-viewport .ag-center-cols-container",
            ".ag-row",
            ".ag-cell",
        ),
        GridStrategy::new("ag-grid", ".ag-center-cols-container", ".ag-row", ".ag-cell"),
        GridStrategy::new(
            "aria-grid",
            "[role='grid']",
            "[role='row']",
            "[role='gridcell']",
        ),
        GridStrategy::new("table", "table", "tbody tr", "td"),
        GridStrategy::new(
            "generic-grid",
            "[class*='grid']",
            "[class*='row']",
            "[class*='cell']",
        ),
    ]
}
