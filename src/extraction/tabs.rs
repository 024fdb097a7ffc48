use crate::browser::{find_first, Browser};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Controls that switch the jobs view to open (unassigned) jobs.
pub const OPEN_JOBS_TAB_SELECTORS: &[&str] = &[
    "[role='tab'][aria-controls*='open']",
    "a[href*='/jobs/open']",
    "#open-jobs-tab",
    "[data-tab='open']",
];

/// Any tab at all. Only clicked when its label mentions open jobs.
pub const GENERIC_TAB_SELECTORS: &[&str] = &["[role='tab']", ".nav-tabs .nav-link"];

/// Click the open-jobs tab if one can be found. Returns whether a tab was
/// clicked; the default view may already be the right one, so `false` is not
/// an error.
pub async fn select_open_jobs_tab<B: Browser>(browser: &B) -> bool {
    let found = match find_first(browser, OPEN_JOBS_TAB_SELECTORS, None).await {
        Some((tab, index)) => Some((tab, OPEN_JOBS_TAB_SELECTORS[index])),
        None => find_labelled_tab(browser).await,
    };
    let Some((tab, selector)) = found else {
        log_debug!("No open-jobs tab found, using the default view");
        return false;
    };
    match browser.click(&tab).await {
        Ok(()) => {
            log_info!("Selected open jobs tab via {selector}");
            true
        }
        Err(err) => {
            log_debug!("Open-jobs tab click failed: {err:#}");
            false
        }
    }
}

async fn find_labelled_tab<B: Browser>(browser: &B) -> Option<(B::Element, &'static str)> {
    for &selector in GENERIC_TAB_SELECTORS {
        let tabs = match browser.find_all(selector, None).await {
            Ok(tabs) => tabs,
            Err(err) => {
                log_debug!("Tab lookup {selector} failed: {err:#}");
                continue;
            }
        };
        for tab in tabs {
            let label = browser.read_text(&tab).await.unwrap_or_default();
            if label.to_lowercase().contains("open") {
                return Some((tab, selector));
            }
        }
    }
    None
}
