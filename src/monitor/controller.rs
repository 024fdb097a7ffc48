use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::browser::Browser;

use super::cycle::Monitor;
use super::loop_worker::poll_loop;

pub struct MonitorController<B: Browser + 'static> {
    handle: Option<JoinHandle<Monitor<B>>>,
    cancel_token: Option<CancellationToken>,
}

impl<B: Browser + 'static> MonitorController<B> {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(&mut self, monitor: Monitor<B>) -> Result<()> {
        if self.is_running() {
            bail!("monitor already running");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(monitor, cancel_token.clone()));

        info!("Poll loop started");
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancel the loop, wait for it to finish its current step, and close
    /// the browser.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let monitor = handle.await.context("poll loop task failed to join")?;
        monitor.shutdown().await;
        Ok(())
    }
}

impl<B: Browser + 'static> Default for MonitorController<B> {
    fn default() -> Self {
        Self::new()
    }
}
