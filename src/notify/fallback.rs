use anyhow::Result;
use async_trait::async_trait;

use super::Transport;

/// Fallback channel when no messaging credentials are configured: alerts go
/// to the log and always count as delivered.
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, text: &str) -> Result<bool> {
        log::info!("ALERT\n{text}");
        Ok(true)
    }
}
