use std::time::Duration;

use chrono::Local;

use crate::models::AssignmentRecord;
use crate::settings::Settings;

use super::Transport;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub struct NotificationDispatcher {
    transport: Box<dyn Transport>,
    max_attempts: u32,
    retry_delay: Duration,
    jobs_url: String,
}

impl NotificationDispatcher {
    pub fn new(
        transport: Box<dyn Transport>,
        max_attempts: u32,
        retry_delay: Duration,
        jobs_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            max_attempts: max_attempts.max(1),
            retry_delay,
            jobs_url: jobs_url.into(),
        }
    }

    pub fn from_settings(transport: Box<dyn Transport>, settings: &Settings) -> Self {
        Self::new(
            transport,
            settings.notify.max_attempts,
            settings.retry_delay(),
            settings.site.jobs_url.clone(),
        )
    }

    pub async fn verify(&self) -> bool {
        let ok = self.transport.verify().await;
        if ok {
            log_info!("{} channel verified", self.transport.name());
        } else {
            log_warn!("{} channel failed verification", self.transport.name());
        }
        ok
    }

    /// Deliver one alert for `record`. Never errors; a missed alert is only
    /// logged.
    pub async fn notify(&self, record: &AssignmentRecord) -> bool {
        let text = format_alert(record, &self.jobs_url);
        let delivered = self.deliver(&text).await;
        if delivered {
            log_info!("Notification sent for job {}", record.id);
        } else {
            log_error!(
                "Giving up on job {} after {} attempts",
                record.id,
                self.max_attempts
            );
        }
        delivered
    }

    pub async fn announce_login(&self, username: &str) -> bool {
        let text = format!(
            "<b>Job monitor started</b>\nLogged in as {} at {}\nWatching {}",
            escape_html(username),
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            escape_html(&self.jobs_url),
        );
        self.deliver(&text).await
    }

    pub async fn send_test_alert(&self) -> bool {
        let text = format!(
            "<b>Test alert</b>\nSent at {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        self.deliver(&text).await
    }

    /// Up to `max_attempts` sends, `retry_delay` apart, stopping at the first
    /// accepted one.
    async fn deliver(&self, text: &str) -> bool {
        for attempt in 1..=self.max_attempts {
            match self.transport.send(text).await {
                Ok(true) => return true,
                Ok(false) => log_warn!(
                    "{} rejected message (attempt {attempt}/{})",
                    self.transport.name(),
                    self.max_attempts
                ),
                Err(err) => log_warn!(
                    "{} send failed (attempt {attempt}/{}): {err:#}",
                    self.transport.name(),
                    self.max_attempts
                ),
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        false
    }
}

/// Fixed alert template, HTML-formatted for the messaging channel.
pub fn format_alert(record: &AssignmentRecord, jobs_url: &str) -> String {
    let date = if record.scheduled_time.is_empty() {
        "Not listed"
    } else {
        record.scheduled_time.as_str()
    };
    format!(
        "<b>New Job Available: Interpretation for {client}</b>\n\n\
         <b>Client:</b> {client}\n\
         <b>Location:</b> {location}\n\
         <b>Date:</b> {date}\n\
         <b>Description:</b>\n{description}\n\n\
         <a href=\"{url}\">View Job</a>",
        client = escape_html(&record.client_name),
        location = escape_html(&record.location),
        date = escape_html(date),
        description = escape_html(&record.description),
        url = escape_html(jobs_url),
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
