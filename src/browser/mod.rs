//! Browser automation capability.
//!
//! The engine only ever talks to a page through [`Browser`]. Selectors are CSS
//! strings; `scope` narrows a lookup to the subtree of a previously found
//! element. Lookups that match nothing return `Ok(None)` / an empty vec, and
//! only transport-level failures surface as errors.

use anyhow::Result;
use async_trait::async_trait;

#[cfg(feature = "chrome")]
pub mod chrome;
#[cfg(test)]
pub(crate) mod fake;
pub mod wait;

#[cfg(feature = "chrome")]
pub use chrome::ChromeBrowser;
pub use wait::{wait_for, wait_until};

#[async_trait]
pub trait Browser: Send + Sync {
    type Element: Send + Sync;

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn find(
        &self,
        selector: &str,
        scope: Option<&Self::Element>,
    ) -> Result<Option<Self::Element>>;

    async fn find_all(
        &self,
        selector: &str,
        scope: Option<&Self::Element>,
    ) -> Result<Vec<Self::Element>>;

    async fn read_text(&self, element: &Self::Element) -> Result<String>;

    async fn read_attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    async fn click(&self, element: &Self::Element) -> Result<()>;

    /// Focus `element` and type `text` into it.
    async fn type_text(&self, element: &Self::Element, text: &str) -> Result<()>;

    /// PNG screenshot of the current page.
    async fn snapshot(&self) -> Result<Vec<u8>>;

    async fn page_source(&self) -> Result<String>;

    async fn current_url(&self) -> Result<String>;

    /// Release the underlying browser process. Safe to call more than once.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Try each selector in order and return the first element found.
/// Lookup errors on one selector fall through to the next.
pub async fn find_first<B: Browser>(
    browser: &B,
    selectors: &[&str],
    scope: Option<&B::Element>,
) -> Option<(B::Element, usize)> {
    for (index, selector) in selectors.iter().enumerate() {
        match browser.find(selector, scope).await {
            Ok(Some(element)) => return Some((element, index)),
            Ok(None) => {}
            Err(err) => log::debug!("selector {selector} failed: {err:#}"),
        }
    }
    None
}
