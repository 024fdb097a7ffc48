use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    pub base_url: String,
    pub login_url: String,
    pub jobs_url: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        let base_url = "https://kyrm.lspware.com".to_string();
        Self {
            login_url: format!("{base_url}/scheduler/#/login"),
            jobs_url: format!("{base_url}/scheduler/#/jobs"),
            base_url,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_id: String,
}

impl TelegramSettings {
    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }
}

/// SMTP account used both to send and to receive alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_server: String::new(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
        }
    }
}

impl EmailSettings {
    pub fn is_configured(&self) -> bool {
        !self.smtp_server.is_empty() && !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Poll loop timing. Durations are stored as whole seconds / milliseconds so
/// the JSON file stays readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub poll_interval_secs: u64,
    pub auth_cooldown_secs: u64,
    pub error_cooldown_secs: u64,
    pub maintenance_every_cycles: u64,
    pub session_max_age_secs: u64,
    pub wait_timeout_ms: u64,
    pub wait_poll_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            auth_cooldown_secs: 60,
            error_cooldown_secs: 60,
            maintenance_every_cycles: 10,
            session_max_age_secs: 30 * 60,
            wait_timeout_ms: 10_000,
            wait_poll_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsSettings {
    pub dir: PathBuf,
    pub max_html_files: usize,
    pub max_screenshot_files: usize,
    pub cleanup_enabled: bool,
}

impl Default for DiagnosticsSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            max_html_files: 5,
            max_screenshot_files: 5,
            cleanup_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub announce_login: bool,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 2_000,
            announce_login: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub site: SiteSettings,
    pub credentials: Credentials,
    pub telegram: TelegramSettings,
    pub email: EmailSettings,
    pub monitor: MonitorSettings,
    pub diagnostics: DiagnosticsSettings,
    pub notify: NotifySettings,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub seen_db_path: Option<PathBuf>,
    /// Launch the browser with a visible window. Only useful when debugging
    /// selectors locally.
    pub headful: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site: SiteSettings::default(),
            credentials: Credentials::default(),
            telegram: TelegramSettings::default(),
            email: EmailSettings::default(),
            monitor: MonitorSettings::default(),
            diagnostics: DiagnosticsSettings::default(),
            notify: NotifySettings::default(),
            log_level: "info".into(),
            log_file: Some(PathBuf::from("logs/scraper.log")),
            seen_db_path: None,
            headful: false,
        }
    }
}

impl Settings {
    /// Load settings from an optional JSON file, then apply environment
    /// overrides. A missing file is not an error; a malformed one is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read settings from {}", path.display()))?;
                serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse settings in {}", path.display()))?
            }
            _ => Settings::default(),
        };

        settings.apply_overrides(|key| env::var(key).ok())?;
        Ok(settings)
    }

    /// Apply `KEY=value` overrides from `lookup`. Split out from `load` so the
    /// precedence rules can be tested without touching process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LSP_USERNAME") {
            self.credentials.username = v;
        }
        if let Some(v) = lookup("LSP_PASSWORD") {
            self.credentials.password = v;
        }
        if let Some(v) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = v;
        }
        if let Some(v) = lookup("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = v;
        }
        if let Some(v) = lookup("EMAIL_SMTP_SERVER") {
            self.email.smtp_server = v;
        }
        if let Some(v) = lookup("EMAIL_SMTP_PORT") {
            self.email.smtp_port = v
                .trim()
                .parse()
                .with_context(|| format!("EMAIL_SMTP_PORT is not a port number: {v}"))?;
        }
        if let Some(v) = lookup("EMAIL_USERNAME") {
            self.email.username = v;
        }
        if let Some(v) = lookup("EMAIL_PASSWORD") {
            self.email.password = v;
        }
        if let Some(v) = lookup("SCRAPE_INTERVAL") {
            self.monitor.poll_interval_secs = v
                .trim()
                .parse()
                .with_context(|| format!("SCRAPE_INTERVAL is not a number: {v}"))?;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = lookup("LOG_FILE") {
            self.log_file = if v.is_empty() { None } else { Some(PathBuf::from(v)) };
        }
        if let Some(v) = lookup("MAX_DATA_FILES") {
            self.diagnostics.max_html_files = v
                .trim()
                .parse()
                .with_context(|| format!("MAX_DATA_FILES is not a number: {v}"))?;
        }
        if let Some(v) = lookup("MAX_SCREENSHOT_FILES") {
            self.diagnostics.max_screenshot_files = v
                .trim()
                .parse()
                .with_context(|| format!("MAX_SCREENSHOT_FILES is not a number: {v}"))?;
        }
        if let Some(v) = lookup("CLEANUP_OLD_FILES") {
            self.diagnostics.cleanup_enabled =
                matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1");
        }
        if let Some(v) = lookup("JOBWATCH_SEEN_DB") {
            self.seen_db_path = if v.is_empty() { None } else { Some(PathBuf::from(v)) };
        }
        Ok(())
    }

    /// Checks needed before the monitor can log in.
    pub fn validate(&self) -> Result<()> {
        if self.credentials.username.is_empty() || self.credentials.password.is_empty() {
            bail!("credentials missing: set LSP_USERNAME and LSP_PASSWORD");
        }
        if self.notify.max_attempts == 0 {
            bail!("notify.max_attempts must be at least 1");
        }
        let limits = [
            ("monitor.poll_interval_secs", self.monitor.poll_interval_secs),
            ("monitor.auth_cooldown_secs", self.monitor.auth_cooldown_secs),
            ("monitor.error_cooldown_secs", self.monitor.error_cooldown_secs),
            ("monitor.wait_timeout_ms", self.monitor.wait_timeout_ms),
            ("monitor.wait_poll_ms", self.monitor.wait_poll_ms),
            ("monitor.maintenance_every_cycles", self.monitor.maintenance_every_cycles),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            bail!("{name} must be greater than zero");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.poll_interval_secs)
    }

    pub fn auth_cooldown(&self) -> Duration {
        Duration::from_secs(self.monitor.auth_cooldown_secs)
    }

    pub fn error_cooldown(&self) -> Duration {
        Duration::from_secs(self.monitor.error_cooldown_secs)
    }

    pub fn session_max_age(&self) -> Duration {
        Duration::from_secs(self.monitor.session_max_age_secs)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.monitor.wait_timeout_ms)
    }

    pub fn wait_poll(&self) -> Duration {
        Duration::from_millis(self.monitor.wait_poll_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.notify.retry_delay_ms)
    }
}
