use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use super::Transport;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Sends every message through each channel. A message counts as delivered
/// only when all channels accepted it. After a partial failure, resending the
/// same text skips the channels that already took it.
pub struct FanoutTransport {
    name: String,
    channels: Vec<Box<dyn Transport>>,
    last: Mutex<Option<(String, Vec<bool>)>>,
}

impl FanoutTransport {
    pub fn new(channels: Vec<Box<dyn Transport>>) -> Self {
        let name = channels
            .iter()
            .map(|c| c.name())
            .collect::<Vec<_>>()
            .join("+");
        Self {
            name,
            channels,
            last: Mutex::new(None),
        }
    }

    fn accepted_before(&self, text: &str) -> Vec<bool> {
        let guard = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match guard.as_ref() {
            Some((previous, accepted)) if previous == text => accepted.clone(),
            _ => vec![false; self.channels.len()],
        }
    }

    fn remember(&self, text: &str, pending: Option<Vec<bool>>) {
        let mut guard = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = pending.map(|accepted| (text.to_string(), accepted));
    }
}

#[async_trait]
impl Transport for FanoutTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, text: &str) -> Result<bool> {
        let mut accepted = self.accepted_before(text);
        for (channel, done) in self.channels.iter().zip(accepted.iter_mut()) {
            if *done {
                continue;
            }
            *done = match channel.send(text).await {
                Ok(ok) => ok,
                Err(err) => {
                    log_warn!("{} send failed: {err:#}", channel.name());
                    false
                }
            };
        }
        let all = accepted.iter().all(|done| *done);
        self.remember(text, if all { None } else { Some(accepted) });
        Ok(all)
    }

    async fn verify(&self) -> bool {
        let mut all = true;
        for channel in &self.channels {
            all &= channel.verify().await;
        }
        all
    }
}
