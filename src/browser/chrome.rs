//! Headless Chromium driver over the DevTools protocol.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::{
    browser::{Browser as CdpBrowser, BrowserConfig},
    element::Element,
    page::{Page, ScreenshotParams},
    Handler,
};
use futures::StreamExt;
use tokio::{sync::Mutex, task::JoinHandle};

use super::Browser;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Default)]
pub struct ChromeOptions {
    pub headful: bool,
    pub executable: Option<PathBuf>,
}

/// One browser process with a single working tab.
pub struct ChromeBrowser {
    browser: Mutex<Option<CdpBrowser>>,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromeBrowser {
    pub async fn launch(options: &ChromeOptions) -> Result<Self> {
        log_info!("Launching Chromium (headful={})", options.headful);

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--log-level=3");
        if options.headful {
            builder = builder.with_head();
        }
        if let Some(path) = &options.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|err| anyhow!("invalid browser config: {err}"))?;

        let (browser, handler) = CdpBrowser::launch(config)
            .await
            .context("failed to launch Chromium")?;
        let handler_task = spawn_handler_task(handler);

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open working tab")?;

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler_task,
        })
    }
}

fn spawn_handler_task(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(err) = event {
                log_warn!("CDP handler event error: {err}");
            }
        }
    })
}

#[async_trait]
impl Browser for ChromeBrowser {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("failed to navigate to {url}"))?;
        Ok(())
    }

    async fn find(&self, selector: &str, scope: Option<&Element>) -> Result<Option<Element>> {
        Ok(self.find_all(selector, scope).await?.into_iter().next())
    }

    async fn find_all(&self, selector: &str, scope: Option<&Element>) -> Result<Vec<Element>> {
        let found = match scope {
            Some(element) => element.find_elements(selector).await,
            None => self.page.find_elements(selector).await,
        };
        found.with_context(|| format!("lookup of {selector} failed"))
    }

    async fn read_text(&self, element: &Element) -> Result<String> {
        Ok(element
            .inner_text()
            .await
            .context("failed to read element text")?
            .unwrap_or_default())
    }

    async fn read_attribute(&self, element: &Element, name: &str) -> Result<Option<String>> {
        element
            .attribute(name)
            .await
            .with_context(|| format!("failed to read attribute {name}"))
    }

    async fn click(&self, element: &Element) -> Result<()> {
        element.click().await.context("click failed")?;
        Ok(())
    }

    async fn type_text(&self, element: &Element, text: &str) -> Result<()> {
        element.click().await.context("failed to focus input")?;
        element.type_str(text).await.context("typing failed")?;
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<u8>> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .context("screenshot failed")
    }

    async fn page_source(&self) -> Result<String> {
        self.page.content().await.context("failed to read page source")
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self
            .page
            .url()
            .await
            .context("failed to read current url")?
            .unwrap_or_default())
    }

    async fn close(&self) -> Result<()> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };
        log_info!("Closing Chromium");
        if let Err(err) = browser.close().await {
            log_warn!("browser close failed: {err}");
        }
        if let Err(err) = browser.wait().await {
            log_warn!("browser wait failed: {err}");
        }
        self.handler_task.abort();
        Ok(())
    }
}

impl Drop for ChromeBrowser {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}
