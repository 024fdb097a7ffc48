use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

use crate::browser::Browser;

use super::cycle::{CycleOutcome, Monitor};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Drive `monitor` until `cancel_token` fires, then hand it back so the
/// caller can release the browser.
///
/// Nothing that happens inside a cycle ends the loop: login failures, cycle
/// errors and panics all turn into a cooldown before the next cycle.
pub async fn poll_loop<B: Browser>(
    mut monitor: Monitor<B>,
    cancel_token: CancellationToken,
) -> Monitor<B> {
    let timing = monitor.timing();

    tokio::select! {
        _ = monitor.verify_channels() => {}
        _ = cancel_token.cancelled() => {
            log_info!("poll loop cancelled before first cycle");
            return monitor;
        }
    }

    loop {
        let cycle = AssertUnwindSafe(monitor.run_cycle()).catch_unwind();
        let delay = tokio::select! {
            outcome = cycle => match outcome {
                Ok(Ok(CycleOutcome::Completed(report))) => {
                    log_info!("{report}");
                    timing.poll_interval
                }
                Ok(Ok(CycleOutcome::AuthFailed)) => {
                    log_error!(
                        "Failed to login, retrying in {}s",
                        timing.auth_cooldown.as_secs()
                    );
                    timing.auth_cooldown
                }
                Ok(Err(err)) => {
                    log_error!("Error in poll cycle: {err:?}");
                    timing.error_cooldown
                }
                Err(panic) => {
                    log_error!("Poll cycle panicked: {}", panic_message(panic.as_ref()));
                    timing.error_cooldown
                }
            },
            _ = cancel_token.cancelled() => {
                log_info!("poll loop cancelled mid-cycle");
                break;
            }
        };

        if monitor.maintenance_due() {
            monitor.run_maintenance();
        }

        if !wait_or_cancel(delay, &cancel_token).await {
            log_info!("poll loop shutting down");
            break;
        }
    }

    monitor
}

/// `false` when cancelled before `delay` elapsed.
async fn wait_or_cancel(delay: Duration, cancel_token: &CancellationToken) -> bool {
    tokio::select! {
        _ = sleep(delay) => true,
        _ = cancel_token.cancelled() => false,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
