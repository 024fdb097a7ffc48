//! Bounded wait-for-condition primitives. Client-rendered pages settle at
//! their own pace, so every wait polls an observable signal until a deadline
//! instead of sleeping a fixed amount.

use std::future::Future;

use anyhow::{bail, Result};
use tokio::time::{sleep, Duration, Instant};

use super::Browser;

/// Poll `condition` every `poll` until it yields `Some`, or fail after
/// `timeout`. The condition is always evaluated at least once.
pub async fn wait_until<T, F, Fut>(
    timeout: Duration,
    poll: Duration,
    mut condition: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = condition().await {
            return Ok(value);
        }
        let now = Instant::now();
        if now >= deadline {
            bail!("condition not met within {}ms", timeout.as_millis());
        }
        sleep(poll.min(deadline - now)).await;
    }
}

/// Wait for `selector` to match inside `scope`. Lookup errors count as "not
/// yet present"; only the deadline produces an error.
pub async fn wait_for<B: Browser>(
    browser: &B,
    selector: &str,
    scope: Option<&B::Element>,
    timeout: Duration,
    poll: Duration,
) -> Result<B::Element> {
    let found = wait_until(timeout, poll, move || async move {
        browser.find(selector, scope).await.ok().flatten()
    })
    .await;

    match found {
        Ok(element) => Ok(element),
        Err(_) => bail!(
            "element {selector} not present after {}ms",
            timeout.as_millis()
        ),
    }
}
