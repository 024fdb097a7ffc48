use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::settings::EmailSettings;

use super::Transport;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const SMTP_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_SUBJECT_CHARS: usize = 120;
const FALLBACK_SUBJECT: &str = "Job monitor alert";

/// HTML mail over SMTP with STARTTLS. The account mails itself.
pub struct EmailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    mailbox: Mailbox,
    server: String,
}

impl EmailTransport {
    pub fn new(settings: &EmailSettings) -> Result<Self> {
        let mailbox: Mailbox = settings.username.parse().with_context(|| {
            format!("EMAIL_USERNAME is not an address: {}", settings.username)
        })?;
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_server)
            .with_context(|| format!("invalid SMTP server {}", settings.smtp_server))?
            .port(settings.smtp_port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();
        Ok(Self {
            mailer,
            mailbox,
            server: format!("{}:{}", settings.smtp_server, settings.smtp_port),
        })
    }

    fn message(&self, text: &str) -> Result<Message> {
        Message::builder()
            .from(self.mailbox.clone())
            .to(self.mailbox.clone())
            .subject(subject_line(text))
            .header(ContentType::TEXT_HTML)
            .body(html_body(text))
            .context("failed to build alert email")
    }
}

/// First non-empty line with markup removed, e.g. the alert headline.
pub fn subject_line(text: &str) -> String {
    let line = text
        .lines()
        .map(|line| strip_tags(line).trim().to_string())
        .find(|line| !line.is_empty())
        .unwrap_or_else(|| FALLBACK_SUBJECT.to_string());
    line.chars().take(MAX_SUBJECT_CHARS).collect()
}

/// Messages are written for a chat client, where newlines are significant.
pub fn html_body(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join("<br>\n")
}

fn strip_tags(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

#[async_trait]
impl Transport for EmailTransport {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, text: &str) -> Result<bool> {
        let message = self.message(text)?;
        let response = self
            .mailer
            .send(message)
            .await
            .with_context(|| format!("SMTP delivery via {} failed", self.server))?;
        if response.is_positive() {
            return Ok(true);
        }
        log_warn!("SMTP server {} answered {}", self.server, response.code());
        Ok(false)
    }

    async fn verify(&self) -> bool {
        match self.mailer.test_connection().await {
            Ok(true) => {
                log_info!("SMTP server {} reachable", self.server);
                true
            }
            Ok(false) => {
                log_warn!("SMTP server {} refused the connection check", self.server);
                false
            }
            Err(err) => {
                log_warn!("SMTP server {} unreachable: {err}", self.server);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;

    fn settings(port: u16) -> EmailSettings {
        EmailSettings {
            smtp_server: "127.0.0.1".into(),
            smtp_port: port,
            username: "alerts@example.com".into(),
            password: "app-password".into(),
        }
    }

    #[test]
    fn subject_is_the_plain_headline() {
        let text = "\n<b>New Job Available: Acme &amp; Sons</b>\n\n<b>Client:</b> x";
        assert_eq!(subject_line(text), "New Job Available: Acme & Sons");
        assert_eq!(subject_line("  \n<br>\n"), FALLBACK_SUBJECT);
        assert_eq!(subject_line(&"x".repeat(500)).len(), MAX_SUBJECT_CHARS);
    }

    #[test]
    fn body_keeps_line_breaks() {
        assert_eq!(html_body("<b>a</b>\nb\n\nc"), "<b>a</b><br>\nb<br>\n<br>\nc");
    }

    #[test]
    fn rejects_non_address_username() {
        let mut bad = settings(587);
        bad.username = "not an address".into();
        assert!(EmailTransport::new(&bad).is_err());
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error_not_a_panic() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let transport = EmailTransport::new(&settings(port)).unwrap();
        assert!(transport.send("<b>New Job</b>").await.is_err());
        assert!(!transport.verify().await);
    }
}
