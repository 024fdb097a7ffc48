pub mod browser;
pub mod db;
pub mod dedup;
pub mod diagnostics;
pub mod extraction;
pub mod models;
pub mod monitor;
pub mod normalize;
pub mod notify;
pub mod session;
pub mod settings;
#[cfg_attr(not(feature = "chrome"), allow(dead_code))]
mod shutdown;
pub mod utils;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use browser::Browser;
use db::Database;
use dedup::{DedupStore, SqliteJournal};
use diagnostics::DiagnosticsCollector;
use extraction::JobExtractor;
use monitor::{Monitor, MonitorTiming};
use notify::{
    EmailTransport, FanoutTransport, LogTransport, NotificationDispatcher, TelegramTransport,
    Transport,
};
use session::{SessionConfig, SessionController};
use settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "jobwatch", version, about = "Alerts on newly posted assignments")]
pub struct Cli {
    /// JSON settings file. Environment variables override its values.
    #[arg(long, global = true, default_value = "jobwatch.json")]
    config: PathBuf,

    /// Show the browser window.
    #[arg(long, global = true)]
    headful: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Poll until stopped (default).
    Run,
    /// Send one test message through the configured channel and exit.
    TestAlert,
    /// Log in, print the assignments currently listed, and exit without alerting.
    Dump,
    /// Print the most recent entries of the seen journal.
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    runtime.block_on(run_cli(cli))
}

async fn run_cli(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(Some(cli.config.as_path()))?;
    settings.headful |= cli.headful;

    utils::init_logging(&settings.log_level, settings.log_file.as_deref())?;
    info!("jobwatch starting up...");

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            settings.validate()?;
            run_monitor(&settings).await
        }
        Command::TestAlert => test_alert(&settings).await,
        Command::Dump => {
            settings.validate()?;
            dump(&settings).await
        }
        Command::History { limit } => {
            print!("{}", journal_history(&settings, limit).await?);
            Ok(())
        }
    }
}

/// Every configured channel (Telegram, email). With none configured, alerts
/// only reach the log.
pub fn build_transport(settings: &Settings) -> Result<Box<dyn Transport>> {
    let mut channels: Vec<Box<dyn Transport>> = Vec::new();
    if settings.telegram.is_configured() {
        channels.push(Box::new(TelegramTransport::new(&settings.telegram)?));
    }
    if settings.email.is_configured() {
        channels.push(Box::new(EmailTransport::new(&settings.email)?));
    }
    match channels.len() {
        0 => {
            warn!("No alert channel configured; alerts will only be logged");
            Ok(Box::new(LogTransport))
        }
        1 => Ok(channels.remove(0)),
        _ => Ok(Box::new(FanoutTransport::new(channels))),
    }
}

/// Wire every component for `browser` from `settings`.
pub async fn build_monitor<B: Browser>(
    browser: B,
    settings: &Settings,
    transport: Box<dyn Transport>,
) -> Result<Monitor<B>> {
    let diagnostics = DiagnosticsCollector::new(&settings.diagnostics);
    let session = SessionController::new(
        browser,
        SessionConfig::from_settings(settings),
        diagnostics.clone(),
    );
    let extractor = JobExtractor::from_settings(settings, diagnostics.clone());
    let dispatcher = NotificationDispatcher::from_settings(transport, settings);

    let dedup = match &settings.seen_db_path {
        Some(path) => {
            let db = Database::new(path.clone())?;
            DedupStore::with_journal(Box::new(SqliteJournal::new(db))).await
        }
        None => DedupStore::new(),
    };

    let monitor = Monitor::new(
        session,
        extractor,
        dedup,
        dispatcher,
        diagnostics,
        MonitorTiming::from_settings(settings),
    );
    Ok(if settings.notify.announce_login {
        monitor.announce_login_as(settings.credentials.username.clone())
    } else {
        monitor
    })
}

/// The newest `limit` seen-journal entries, rendered for the terminal.
pub async fn journal_history(settings: &Settings, limit: usize) -> Result<String> {
    let Some(path) = &settings.seen_db_path else {
        bail!("no seen journal configured: set seen_db_path or JOBWATCH_SEEN_DB");
    };
    if !path.exists() {
        bail!("seen journal {} does not exist yet", path.display());
    }
    let db = Database::new(path.clone())?;
    let entries = db.recent_notified(limit).await?;
    Ok(monitor::format_history(db.path(), &entries))
}

async fn test_alert(settings: &Settings) -> Result<()> {
    let dispatcher = NotificationDispatcher::from_settings(build_transport(settings)?, settings);
    dispatcher.verify().await;
    if !dispatcher.send_test_alert().await {
        bail!("test alert was not delivered");
    }
    println!("Test alert delivered");
    Ok(())
}

#[cfg(feature = "chrome")]
async fn launch_browser(settings: &Settings) -> Result<browser::ChromeBrowser> {
    let options = browser::chrome::ChromeOptions {
        headful: settings.headful,
        executable: std::env::var_os("CHROME_PATH").map(PathBuf::from),
    };
    browser::ChromeBrowser::launch(&options).await
}

#[cfg(feature = "chrome")]
async fn run_monitor(settings: &Settings) -> Result<()> {
    let browser = launch_browser(settings).await?;
    let monitor = build_monitor(browser, settings, build_transport(settings)?).await?;

    let mut controller = monitor::MonitorController::new();
    controller.start(monitor)?;
    let waited = shutdown::wait_for_shutdown_signal().await;
    controller.stop().await?;
    waited
}

#[cfg(feature = "chrome")]
async fn dump(settings: &Settings) -> Result<()> {
    let browser = launch_browser(settings).await?;
    let mut monitor = build_monitor(browser, settings, Box::new(LogTransport)).await?;
    let discovered = monitor.discover().await;
    monitor.shutdown().await;
    print!("{}", monitor::format_dump(&discovered?));
    Ok(())
}

#[cfg(not(feature = "chrome"))]
async fn run_monitor(_settings: &Settings) -> Result<()> {
    no_browser_driver()
}

#[cfg(not(feature = "chrome"))]
async fn dump(_settings: &Settings) -> Result<()> {
    no_browser_driver()
}

#[cfg(not(feature = "chrome"))]
fn no_browser_driver() -> Result<()> {
    bail!("jobwatch was built without a browser driver; rebuild with `--features chrome`")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_to_run() {
        let cli = Cli::try_parse_from(["jobwatch"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.config, PathBuf::from("jobwatch.json"));

        let cli = Cli::try_parse_from(["jobwatch", "dump", "--config", "x.json", "--headful"])
            .unwrap();
        assert_eq!(cli.command, Some(Command::Dump));
        assert_eq!(cli.config, PathBuf::from("x.json"));
        assert!(cli.headful);

        let cli = Cli::try_parse_from(["jobwatch", "test-alert"]).unwrap();
        assert_eq!(cli.command, Some(Command::TestAlert));

        let cli = Cli::try_parse_from(["jobwatch", "history", "--limit", "3"]).unwrap();
        assert_eq!(cli.command, Some(Command::History { limit: 3 }));
    }

    #[tokio::test]
    async fn history_reads_back_journal_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        assert!(journal_history(&settings, 5).await.is_err());

        let path = tmp.path().join("seen.db");
        settings.seen_db_path = Some(path.clone());
        assert!(journal_history(&settings, 5).await.is_err());

        {
            let journal = SqliteJournal::new(Database::new(path).unwrap());
            let record = normalize::normalize(&models::RawRecord {
                row_id: Some("10001".into()),
                client_name: Some("Acme Corp".into()),
                ..models::RawRecord::default()
            });
            dedup::SeenJournal::remember(&journal, &record, true)
                .await
                .unwrap();
        }

        let text = journal_history(&settings, 5).await.unwrap();
        assert!(text.starts_with("Last 1 notifications in "));
        assert!(text.contains(" sent   10001  Acme Corp at "));
    }

    #[test]
    fn unconfigured_telegram_falls_back_to_log() {
        let transport = build_transport(&Settings::default()).unwrap();
        assert_eq!(transport.name(), "log");
    }

    #[tokio::test]
    async fn configured_channels_are_combined() {
        let mut settings = Settings::default();
        settings.telegram.bot_token = "123456:ABCDEFGH".into();
        settings.telegram.chat_id = "42".into();
        assert_eq!(build_transport(&settings).unwrap().name(), "telegram");

        settings.email.smtp_server = "smtp.example.com".into();
        settings.email.username = "alerts@example.com".into();
        settings.email.password = "app-password".into();
        assert_eq!(build_transport(&settings).unwrap().name(), "telegram+email");
    }
}
