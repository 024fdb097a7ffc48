//! Alert formatting and delivery.

pub mod dispatcher;
pub mod email;
pub mod fallback;
pub mod fanout;
pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

pub use dispatcher::{format_alert, NotificationDispatcher};
pub use email::EmailTransport;
pub use fallback::LogTransport;
pub use fanout::FanoutTransport;
pub use telegram::TelegramTransport;

/// Message delivery channel.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(true)` only when the channel accepted the message.
    async fn send(&self, text: &str) -> Result<bool>;

    /// Startup reachability check. Never fatal.
    async fn verify(&self) -> bool {
        true
    }
}
