use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use jobwatch_lib::browser::Browser;
use jobwatch_lib::monitor::{poll_loop, CycleOutcome, MonitorController, MonitorTiming};
use jobwatch_lib::notify::Transport;
use jobwatch_lib::settings::Settings;

const LOGIN: &str = "https://scheduler.test/scheduler/#/login";
const JOBS: &str = "https://scheduler.test/scheduler/#/jobs";
const ACME: [&str; 4] = ["10001", "Acme Corp", "03/14/2025 10:00 AM", "60"];

#[derive(Default)]
struct PageState {
    url: String,
    rows: Vec<Vec<String>>,
    jobs_navigations: usize,
    login_navigations: usize,
    panic_on_jobs_navigation: Option<usize>,
    fail_jobs_navigation: Option<usize>,
    rejected_logins: usize,
    closed: bool,
}

/// A scripted single-page scheduler: a login form whose submit button lands
/// on the jobs grid, and a grid whose rows the test can change.
#[derive(Clone, Default)]
struct ScriptedBrowser {
    state: Arc<Mutex<PageState>>,
}

impl ScriptedBrowser {
    fn with_rows(rows: &[[&str; 4]]) -> Self {
        let browser = Self::default();
        for row in rows {
            browser.push_row(*row);
        }
        browser
    }

    fn push_row(&self, row: [&str; 4]) {
        self.state
            .lock()
            .unwrap()
            .rows
            .push(row.iter().map(|c| c.to_string()).collect());
    }

    fn panic_on_jobs_navigation(&self, nth: usize) {
        self.state.lock().unwrap().panic_on_jobs_navigation = Some(nth);
    }

    fn fail_jobs_navigation(&self, nth: usize) {
        self.state.lock().unwrap().fail_jobs_navigation = Some(nth);
    }

    /// The next `count` submits leave the page on the login form.
    fn reject_logins(&self, count: usize) {
        self.state.lock().unwrap().rejected_logins = count;
    }

    fn jobs_navigations(&self) -> usize {
        self.state.lock().unwrap().jobs_navigations
    }

    fn login_navigations(&self) -> usize {
        self.state.lock().unwrap().login_navigations
    }

    fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl Browser for ScriptedBrowser {
    type Element = String;

    async fn navigate(&self, url: &str) -> Result<()> {
        let (crash, fail) = {
            let mut state = self.state.lock().unwrap();
            if url.contains("/jobs") {
                state.jobs_navigations += 1;
            } else if url.contains("/login") {
                state.login_navigations += 1;
            }
            let nth = Some(state.jobs_navigations);
            let jobs = url.contains("/jobs");
            let crash = jobs && state.panic_on_jobs_navigation == nth;
            let fail = jobs && state.fail_jobs_navigation == nth;
            if !crash && !fail {
                state.url = url.to_string();
            }
            (crash, fail)
        };
        if crash {
            panic!("renderer crashed while loading {url}");
        }
        if fail {
            anyhow::bail!("net::ERR_CONNECTION_RESET loading {url}");
        }
        Ok(())
    }

    async fn find(&self, selector: &str, scope: Option<&String>) -> Result<Option<String>> {
        let found = match (selector, scope) {
            (
                "input[name='email']" | "input[name='password']" | "button[name='btn-login']",
                None,
            ) => Some(selector.to_string()),
            (".ag-center-cols-container", None) => Some("grid".to_string()),
            _ => None,
        };
        Ok(found)
    }

    async fn find_all(&self, selector: &str, scope: Option<&String>) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        let found = match (selector, scope.map(String::as_str)) {
            (".ag-row", Some("grid")) => {
                (0..state.rows.len()).map(|i| format!("row:{i}")).collect()
            }
            (".ag-cell", Some(row)) => {
                let index: usize = row
                    .strip_prefix("row:")
                    .and_then(|i| i.parse().ok())
                    .unwrap_or(usize::MAX);
                let cells = state.rows.get(index).map(Vec::len).unwrap_or(0);
                (0..cells).map(|j| format!("cell:{index}:{j}")).collect()
            }
            _ => Vec::new(),
        };
        Ok(found)
    }

    async fn read_text(&self, element: &String) -> Result<String> {
        let state = self.state.lock().unwrap();
        let mut parts = element.split(':').skip(1).map(|p| p.parse::<usize>().unwrap_or(0));
        let (i, j) = (parts.next().unwrap_or(0), parts.next().unwrap_or(0));
        Ok(state
            .rows
            .get(i)
            .and_then(|row| row.get(j))
            .cloned()
            .unwrap_or_default())
    }

    async fn read_attribute(&self, _element: &String, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn click(&self, element: &String) -> Result<()> {
        if element == "button[name='btn-login']" {
            let mut state = self.state.lock().unwrap();
            if state.rejected_logins > 0 {
                state.rejected_logins -= 1;
            } else {
                state.url = JOBS.to_string();
            }
        }
        Ok(())
    }

    async fn type_text(&self, _element: &String, _text: &str) -> Result<()> {
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn page_source(&self) -> Result<String> {
        Ok(String::new())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

#[derive(Clone, Default)]
struct Outbox {
    sent: Arc<Mutex<Vec<String>>>,
}

impl Outbox {
    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    fn mentions(&self, needle: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|text| text.contains(needle))
            .count()
    }
}

#[async_trait]
impl Transport for Outbox {
    fn name(&self) -> &str {
        "outbox"
    }

    async fn send(&self, text: &str) -> Result<bool> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(true)
    }
}

fn settings(dir: &std::path::Path) -> Settings {
    let mut settings = Settings::default();
    settings.site.login_url = LOGIN.into();
    settings.site.jobs_url = JOBS.into();
    settings.credentials.username = "alice@example.com".into();
    settings.credentials.password = "hunter2".into();
    settings.monitor.wait_timeout_ms = 40;
    settings.monitor.wait_poll_ms = 5;
    settings.notify.retry_delay_ms = 1;
    settings.notify.announce_login = false;
    settings.diagnostics.dir = dir.join("diagnostics");
    settings.log_file = None;
    settings
}

fn fast_timing() -> MonitorTiming {
    MonitorTiming {
        poll_interval: Duration::from_millis(10),
        auth_cooldown: Duration::from_millis(10),
        error_cooldown: Duration::from_millis(10),
        maintenance_every: 3,
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 5s");
}

#[tokio::test(flavor = "multi_thread")]
async fn crashed_cycle_does_not_stop_the_loop() {
    let tmp = tempfile::tempdir().unwrap();
    let browser = ScriptedBrowser::with_rows(&[ACME]);
    // Navigation #1 is the post-login landing page, #2 the first extraction.
    browser.panic_on_jobs_navigation(2);
    let outbox = Outbox::default();

    let monitor = jobwatch_lib::build_monitor(
        browser.clone(),
        &settings(tmp.path()),
        Box::new(outbox.clone()),
    )
    .await
    .unwrap()
    .with_timing(fast_timing());

    let cancel = CancellationToken::new();
    let task = tokio::spawn(poll_loop(monitor, cancel.clone()));

    wait_for(|| outbox.count() >= 1).await;
    assert!(browser.jobs_navigations() >= 3);

    cancel.cancel();
    let monitor = task.await.unwrap();
    assert!(monitor.cycles() >= 2);
    assert_eq!(outbox.mentions("Acme Corp"), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn login_and_extraction_failures_only_delay_the_next_cycle() {
    let tmp = tempfile::tempdir().unwrap();
    let browser = ScriptedBrowser::with_rows(&[ACME]);
    // Cycle 1 cannot log in. Cycle 2 logs in (landing page is jobs
    // navigation #1) and its extraction load (#2) fails.
    browser.reject_logins(1);
    browser.fail_jobs_navigation(2);
    let outbox = Outbox::default();

    let monitor = jobwatch_lib::build_monitor(
        browser.clone(),
        &settings(tmp.path()),
        Box::new(outbox.clone()),
    )
    .await
    .unwrap()
    .with_timing(fast_timing());

    let cancel = CancellationToken::new();
    let task = tokio::spawn(poll_loop(monitor, cancel.clone()));

    wait_for(|| outbox.count() >= 1).await;
    cancel.cancel();
    let monitor = task.await.unwrap();

    assert!(monitor.cycles() >= 3);
    assert_eq!(browser.login_navigations(), 2);
    assert!(browser.jobs_navigations() >= 3);
    assert_eq!(outbox.mentions("Acme Corp"), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn each_assignment_alerts_once_across_cycles() {
    let tmp = tempfile::tempdir().unwrap();
    let browser = ScriptedBrowser::with_rows(&[
        ACME,
        ["10002", "Globex", "03/14/2025 01:30 PM", "90"],
    ]);
    let outbox = Outbox::default();
    let monitor = jobwatch_lib::build_monitor(
        browser.clone(),
        &settings(tmp.path()),
        Box::new(outbox.clone()),
    )
    .await
    .unwrap()
    .with_timing(fast_timing());

    let mut controller = MonitorController::new();
    controller.start(monitor).unwrap();
    assert!(controller.is_running());

    wait_for(|| outbox.count() == 2 && browser.jobs_navigations() >= 4).await;
    browser.push_row(["10003", "Initech", "03/15/2025 09:00 AM", "30"]);
    wait_for(|| outbox.count() == 3).await;
    let seen = browser.jobs_navigations();
    wait_for(|| browser.jobs_navigations() >= seen + 2).await;

    controller.stop().await.unwrap();
    assert!(!controller.is_running());
    assert!(browser.is_closed());
    assert_eq!(outbox.count(), 3);
    assert_eq!(outbox.mentions("Acme Corp"), 1);
    assert_eq!(outbox.mentions("Initech"), 1);
    assert_eq!(browser.login_navigations(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn journal_prevents_replay_after_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let mut settings = settings(tmp.path());
    settings.seen_db_path = Some(tmp.path().join("seen.db"));
    let rows = [ACME];

    let first_outbox = Outbox::default();
    let mut first = jobwatch_lib::build_monitor(
        ScriptedBrowser::with_rows(&rows),
        &settings,
        Box::new(first_outbox.clone()),
    )
    .await
    .unwrap();
    assert!(matches!(
        first.run_cycle().await.unwrap(),
        CycleOutcome::Completed(report) if report.notified == 1
    ));
    first.shutdown().await;

    let second_outbox = Outbox::default();
    let mut second = jobwatch_lib::build_monitor(
        ScriptedBrowser::with_rows(&rows),
        &settings,
        Box::new(second_outbox.clone()),
    )
    .await
    .unwrap();
    match second.run_cycle().await.unwrap() {
        CycleOutcome::Completed(report) => {
            assert_eq!(report.found, 1);
            assert_eq!(report.new, 0);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(second_outbox.count(), 0);
}
