use std::time::Duration;

use tokio::time::Instant;

use crate::browser::{find_first, Browser};
use crate::diagnostics::DiagnosticsCollector;
use crate::settings::Settings;

use super::signals::{
    classify_login, is_login_surface, wait_for_any, LoginOutcome, PASSWORD_SELECTORS,
    SUBMIT_SELECTORS, USERNAME_SELECTORS,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Expired,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub login_url: String,
    pub landing_url: String,
    pub username: String,
    pub password: String,
    pub wait_timeout: Duration,
    pub wait_poll: Duration,
    pub max_age: Duration,
}

impl SessionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            login_url: settings.site.login_url.clone(),
            landing_url: settings.site.jobs_url.clone(),
            username: settings.credentials.username.clone(),
            password: settings.credentials.password.clone(),
            wait_timeout: settings.wait_timeout(),
            wait_poll: settings.wait_poll(),
            max_age: settings.session_max_age(),
        }
    }
}

/// Owns the single authenticated browser session. Extraction borrows the
/// browser through [`SessionController::browser`] and never outlives a cycle.
pub struct SessionController<B: Browser> {
    browser: B,
    config: SessionConfig,
    diagnostics: DiagnosticsCollector,
    state: SessionState,
    authenticated_at: Option<Instant>,
    logins: u64,
}

impl<B: Browser> SessionController<B> {
    pub fn new(browser: B, config: SessionConfig, diagnostics: DiagnosticsCollector) -> Self {
        Self {
            browser,
            config,
            diagnostics,
            state: SessionState::Unauthenticated,
            authenticated_at: None,
            logins: 0,
        }
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of successful logins so far.
    pub fn login_count(&self) -> u64 {
        self.logins
    }

    /// Returns immediately when the current session still looks fresh,
    /// otherwise runs a full login.
    pub async fn ensure_authenticated(&mut self) -> bool {
        if self.state == SessionState::Authenticated {
            if self.is_fresh().await {
                return true;
            }
            log_info!("Session expired, logging in again");
            self.state = SessionState::Expired;
        }
        self.login().await
    }

    async fn is_fresh(&self) -> bool {
        let young = self
            .authenticated_at
            .is_some_and(|at| at.elapsed() < self.config.max_age);
        if !young {
            return false;
        }
        match self.browser.current_url().await {
            Ok(url) => !is_login_surface(&url),
            Err(err) => {
                log_warn!("cannot read current url, treating session as stale: {err:#}");
                false
            }
        }
    }

    pub async fn login(&mut self) -> bool {
        self.state = SessionState::Authenticating;
        let ok = self.try_login().await;
        if ok {
            self.state = SessionState::Authenticated;
            self.authenticated_at = Some(Instant::now());
            self.logins += 1;
        } else {
            self.state = SessionState::Unauthenticated;
            self.authenticated_at = None;
        }
        ok
    }

    async fn try_login(&self) -> bool {
        let browser = &self.browser;
        let cfg = &self.config;

        log_info!("Opening login page {}", cfg.login_url);
        if let Err(err) = browser.navigate(&cfg.login_url).await {
            log_error!("Login page unreachable: {err:#}");
            return false;
        }

        let Some(username) =
            wait_for_any(browser, USERNAME_SELECTORS, cfg.wait_timeout, cfg.wait_poll).await
        else {
            log_error!("Username field not found after {}ms", cfg.wait_timeout.as_millis());
            self.diagnostics.capture(browser, "login_form_missing").await;
            return false;
        };

        let Some((password, _)) = find_first(browser, PASSWORD_SELECTORS, None).await else {
            log_error!("Password field not found");
            self.diagnostics.capture(browser, "password_missing").await;
            return false;
        };

        if let Err(err) = browser.type_text(&username, &cfg.username).await {
            log_error!("Failed to enter username: {err:#}");
            return false;
        }
        if let Err(err) = browser.type_text(&password, &cfg.password).await {
            log_error!("Failed to enter password: {err:#}");
            return false;
        }

        let Some((submit, index)) = find_first(browser, SUBMIT_SELECTORS, None).await else {
            log_error!("Login button not found");
            self.diagnostics.capture(browser, "submit_missing").await;
            return false;
        };
        log_info!("Submitting credentials via {}", SUBMIT_SELECTORS[index]);
        if let Err(err) = browser.click(&submit).await {
            log_error!("Login submit failed: {err:#}");
            return false;
        }

        let outcome = classify_login(browser, cfg.wait_timeout, cfg.wait_poll).await;
        match outcome {
            LoginOutcome::Confirmed(signal) => log_info!("Login confirmed by {signal:?} signal"),
            LoginOutcome::Assumed => {
                log_warn!("No post-login signal matched; assuming success");
                self.diagnostics.capture(browser, "login_ambiguous").await;
            }
            LoginOutcome::Failed => {
                let url = browser.current_url().await.unwrap_or_default();
                log_error!("Login failed, still on {url}");
                self.diagnostics.capture(browser, "login_failed").await;
                return false;
            }
        }

        // The app does not reliably land on the jobs view by itself.
        if let Err(err) = browser.navigate(&cfg.landing_url).await {
            log_warn!("Could not open landing page {}: {err:#}", cfg.landing_url);
        }
        true
    }

    /// Release the browser. Consumes the controller so no extraction can run
    /// against a closed session.
    pub async fn shutdown(self) {
        if let Err(err) = self.browser.close().await {
            log_warn!("browser shutdown failed: {err:#}");
        }
    }
}
