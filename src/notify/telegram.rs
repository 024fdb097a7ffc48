use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::settings::TelegramSettings;

use super::Transport;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct TelegramTransport {
    http: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Debug, Deserialize)]
struct GetMeResponse {
    ok: bool,
    result: Option<BotUser>,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    username: Option<String>,
}

impl TelegramTransport {
    pub fn new(settings: &TelegramSettings) -> Result<Self> {
        Self::with_api_base(settings, DEFAULT_API_BASE)
    }

    pub fn with_api_base(settings: &TelegramSettings, api_base: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to construct reqwest client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: settings.bot_token.clone(),
            chat_id: settings.chat_id.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    /// Token shape for logs: first and last four characters only.
    fn redacted_token(&self) -> String {
        redact(&self.bot_token)
    }
}

fn redact(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn has_markup(text: &str) -> bool {
    text.contains('<') && text.contains('>')
}

#[async_trait]
impl Transport for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, text: &str) -> Result<bool> {
        let mut body = json!({
            "chat_id": self.chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });
        if has_markup(text) {
            body["parse_mode"] = json!("HTML");
        }

        let response = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            // reqwest errors carry the URL, which carries the token.
            .map_err(|err| err.without_url())
            .context("telegram sendMessage request failed")?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(true);
        }
        let detail = response.text().await.unwrap_or_default();
        log_warn!("telegram sendMessage returned {status}: {detail}");
        Ok(false)
    }

    async fn verify(&self) -> bool {
        let response = match self.http.get(self.method_url("getMe")).send().await {
            Ok(response) => response,
            Err(err) => {
                log_warn!(
                    "telegram getMe failed for token {}: {}",
                    self.redacted_token(),
                    err.without_url()
                );
                return false;
            }
        };
        match response.json::<GetMeResponse>().await {
            Ok(GetMeResponse {
                ok: true,
                result: Some(user),
            }) => {
                log_info!(
                    "Telegram bot verified: @{}",
                    user.username.unwrap_or_default()
                );
                true
            }
            Ok(_) => {
                log_warn!("telegram rejected token {}", self.redacted_token());
                false
            }
            Err(err) => {
                log_warn!("unreadable getMe response: {}", err.without_url());
                false
            }
        }
    }
}
