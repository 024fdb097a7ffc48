use std::time::Duration;

use anyhow::{bail, Result};

use crate::browser::Browser;
use crate::dedup::DedupStore;
use crate::diagnostics::DiagnosticsCollector;
use crate::extraction::JobExtractor;
use crate::models::AssignmentRecord;
use crate::notify::NotificationDispatcher;
use crate::session::SessionController;
use crate::settings::Settings;

use super::report::CycleReport;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorTiming {
    pub poll_interval: Duration,
    pub auth_cooldown: Duration,
    pub error_cooldown: Duration,
    pub maintenance_every: u64,
}

impl MonitorTiming {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            auth_cooldown: settings.auth_cooldown(),
            error_cooldown: settings.error_cooldown(),
            maintenance_every: settings.monitor.maintenance_every_cycles.max(1),
        }
    }
}

impl Default for MonitorTiming {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    AuthFailed,
}

/// Everything one poll cycle touches. Owned by the loop task; nothing in here
/// is shared.
pub struct Monitor<B: Browser> {
    session: SessionController<B>,
    extractor: JobExtractor<B>,
    dedup: DedupStore,
    dispatcher: NotificationDispatcher,
    diagnostics: DiagnosticsCollector,
    timing: MonitorTiming,
    announce_as: Option<String>,
    announced: bool,
    cycles: u64,
}

impl<B: Browser> Monitor<B> {
    pub fn new(
        session: SessionController<B>,
        extractor: JobExtractor<B>,
        dedup: DedupStore,
        dispatcher: NotificationDispatcher,
        diagnostics: DiagnosticsCollector,
        timing: MonitorTiming,
    ) -> Self {
        Self {
            session,
            extractor,
            dedup,
            dispatcher,
            diagnostics,
            timing,
            announce_as: None,
            announced: false,
            cycles: 0,
        }
    }

    /// Send a one-time "monitor started" message after the first login.
    pub fn announce_login_as(mut self, username: impl Into<String>) -> Self {
        self.announce_as = Some(username.into());
        self
    }

    pub fn with_timing(mut self, timing: MonitorTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn timing(&self) -> MonitorTiming {
        self.timing
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn session(&self) -> &SessionController<B> {
        &self.session
    }

    pub fn dedup(&self) -> &DedupStore {
        &self.dedup
    }

    pub async fn verify_channels(&self) -> bool {
        self.dispatcher.verify().await
    }

    /// Authenticate, extract, and alert on every unseen record.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        self.cycles += 1;
        let cycle = self.cycles;

        if !self.session.ensure_authenticated().await {
            return Ok(CycleOutcome::AuthFailed);
        }
        self.announce_once().await;

        let extraction = self.extractor.extract(self.session.browser()).await?;
        let mut report = CycleReport {
            cycle,
            found: extraction.records.len(),
            strategy: extraction.strategy,
            ..CycleReport::default()
        };

        for record in &extraction.records {
            if !self.dedup.is_new(&record.id) {
                continue;
            }
            report.new += 1;
            log_info!(
                "New job {} ({} id): {} at {}",
                record.id,
                record.id_source.as_str(),
                record.client_name,
                record.scheduled_time
            );
            let delivered = self.dispatcher.notify(record).await;
            self.dedup.record_attempt(record, delivered).await;
            if delivered {
                report.notified += 1;
            } else {
                report.failed += 1;
            }
        }

        Ok(CycleOutcome::Completed(report))
    }

    /// Authenticate and extract once without touching the seen set.
    pub async fn discover(&mut self) -> Result<Vec<AssignmentRecord>> {
        if !self.session.ensure_authenticated().await {
            bail!("login failed");
        }
        let extraction = self.extractor.extract(self.session.browser()).await?;
        Ok(extraction.records)
    }

    pub fn maintenance_due(&self) -> bool {
        self.cycles > 0 && self.cycles % self.timing.maintenance_every == 0
    }

    pub fn run_maintenance(&self) {
        log_info!("Running maintenance after cycle {}", self.cycles);
        self.diagnostics.prune();
    }

    async fn announce_once(&mut self) {
        if self.announced {
            return;
        }
        let Some(username) = self.announce_as.as_deref() else {
            return;
        };
        self.announced = true;
        if !self.dispatcher.announce_login(username).await {
            log_warn!("Login announcement could not be delivered");
        }
    }

    /// Close the browser. Consumes the monitor.
    pub async fn shutdown(self) {
        log_info!("Monitor stopped after {} cycles", self.cycles);
        self.session.shutdown().await;
    }
}
