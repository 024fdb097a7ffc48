//! Selector lists and post-login signals for the target application. Every
//! list is in priority order; the first match wins.

use std::time::Duration;

use crate::browser::{find_first, wait_for, wait_until, Browser};

pub const USERNAME_SELECTORS: &[&str] = &[
    "input[name='email']",
    "input[type='email']",
    "input[name='username']",
    "input[formcontrolname='email']",
    "#email",
];

pub const PASSWORD_SELECTORS: &[&str] = &[
    "input[name='password']",
    "input[type='password']",
    "input[formcontrolname='password']",
    "#password",
];

pub const SUBMIT_SELECTORS: &[&str] = &[
    "button[name='btn-login']",
    "button[type='submit']",
    "input[type='submit']",
    "form button",
];

pub const POST_LOGIN_URL_PATTERNS: &[&str] = &["/jobs", "/dashboard", "/home", "/calendar"];

pub const POST_LOGIN_ELEMENTS: &[&str] = &[
    ".ag-body-viewport",
    "ag-grid-angular",
    "[routerlink='/jobs']",
    "nav.navbar",
];

pub const POST_LOGIN_KEYWORDS: &[&str] = &["Logout", "Log Out", "Sign Out", "Open Jobs", "My Jobs"];

pub const LOGIN_SURFACE_MARKERS: &[&str] = &["/login", "/signin"];

/// Which signal confirmed the login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginSignal {
    Url,
    Element,
    Keyword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Confirmed(LoginSignal),
    /// No signal fired but the page left the login surface.
    Assumed,
    Failed,
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, LoginOutcome::Failed)
    }
}

pub fn is_login_surface(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    LOGIN_SURFACE_MARKERS.iter().any(|marker| url.contains(marker))
}

pub fn matches_post_login_url(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    !is_login_surface(&url) && POST_LOGIN_URL_PATTERNS.iter().any(|p| url.contains(p))
}

pub fn contains_post_login_keyword(source: &str) -> bool {
    POST_LOGIN_KEYWORDS.iter().any(|kw| source.contains(kw))
}

/// Run the signal battery after the credentials were submitted. Each signal
/// is tried in turn; falling through all of them is only a failure if the
/// page still sits on the login surface.
pub async fn classify_login<B: Browser>(
    browser: &B,
    timeout: Duration,
    poll: Duration,
) -> LoginOutcome {
    let url_signal = wait_until(timeout, poll, move || async move {
        browser
            .current_url()
            .await
            .ok()
            .filter(|url| matches_post_login_url(url))
    })
    .await;
    if url_signal.is_ok() {
        return LoginOutcome::Confirmed(LoginSignal::Url);
    }

    // The grid usually renders within a fraction of the full wait.
    let element_timeout = timeout / 2;
    let element_signal = wait_until(element_timeout, poll, move || async move {
        find_first(browser, POST_LOGIN_ELEMENTS, None).await.map(|_| ())
    })
    .await;
    if element_signal.is_ok() {
        return LoginOutcome::Confirmed(LoginSignal::Element);
    }

    if let Ok(source) = browser.page_source().await {
        if contains_post_login_keyword(&source) {
            return LoginOutcome::Confirmed(LoginSignal::Keyword);
        }
    }

    match browser.current_url().await {
        Ok(url) if !is_login_surface(&url) => LoginOutcome::Assumed,
        _ => LoginOutcome::Failed,
    }
}

/// Wait for the first credential field selector to materialize.
pub async fn wait_for_any<B: Browser>(
    browser: &B,
    selectors: &[&str],
    timeout: Duration,
    poll: Duration,
) -> Option<B::Element> {
    match selectors {
        [] => None,
        [only] => wait_for(browser, only, None, timeout, poll).await.ok(),
        _ => wait_until(timeout, poll, move || async move {
            find_first(browser, selectors, None).await.map(|(el, _)| el)
        })
        .await
        .ok(),
    }
}
