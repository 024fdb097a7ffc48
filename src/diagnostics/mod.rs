//! Page snapshots for offline troubleshooting. Everything here is best
//! effort: failures are logged and swallowed, and nothing is read back by the
//! engine.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Local;

use crate::browser::Browser;
use crate::settings::DiagnosticsSettings;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const HTML_PREFIX: &str = "page_";
const SCREENSHOT_PREFIX: &str = "screenshot_";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub html: Option<PathBuf>,
    pub screenshot: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DiagnosticsCollector {
    dir: PathBuf,
    max_html_files: usize,
    max_screenshot_files: usize,
    cleanup_enabled: bool,
}

impl DiagnosticsCollector {
    pub fn new(settings: &DiagnosticsSettings) -> Self {
        Self {
            dir: settings.dir.clone(),
            max_html_files: settings.max_html_files,
            max_screenshot_files: settings.max_screenshot_files,
            cleanup_enabled: settings.cleanup_enabled,
        }
    }

    /// Save the current markup and a screenshot, tagged with `label`.
    pub async fn capture<B: Browser>(&self, browser: &B, label: &str) -> Snapshot {
        let stamp = Local::now().format("%Y%m%d_%H%M%S%3f");
        let label = sanitize_label(label);
        let mut snapshot = Snapshot::default();

        if let Err(err) = fs::create_dir_all(&self.dir) {
            log_warn!(
                "cannot create diagnostics dir {}: {err}",
                self.dir.display()
            );
            return snapshot;
        }

        match browser.page_source().await {
            Ok(html) => {
                let path = self.dir.join(format!("{HTML_PREFIX}{label}_{stamp}.html"));
                match fs::write(&path, html) {
                    Ok(()) => snapshot.html = Some(path),
                    Err(err) => log_warn!("failed to write {}: {err}", path.display()),
                }
            }
            Err(err) => log_warn!("page source unavailable for snapshot {label}: {err:#}"),
        }

        match browser.snapshot().await {
            Ok(png) => {
                let path = self
                    .dir
                    .join(format!("{SCREENSHOT_PREFIX}{label}_{stamp}.png"));
                match fs::write(&path, png) {
                    Ok(()) => snapshot.screenshot = Some(path),
                    Err(err) => log_warn!("failed to write {}: {err}", path.display()),
                }
            }
            Err(err) => log_warn!("screenshot unavailable for snapshot {label}: {err:#}"),
        }

        log_info!(
            "Diagnostic snapshot {label}: html={:?} screenshot={:?}",
            snapshot.html,
            snapshot.screenshot
        );
        snapshot
    }

    /// Evict the oldest artifacts above the configured maximum of each kind.
    /// Returns how many files were removed.
    pub fn prune(&self) -> usize {
        if !self.cleanup_enabled {
            return 0;
        }
        let mut removed = 0;
        for (prefix, keep) in [
            (HTML_PREFIX, self.max_html_files),
            (SCREENSHOT_PREFIX, self.max_screenshot_files),
        ] {
            match prune_kind(&self.dir, prefix, keep) {
                Ok(count) => removed += count,
                Err(err) => {
                    log_warn!("pruning {prefix}* in {} failed: {err:#}", self.dir.display())
                }
            }
        }
        if removed > 0 {
            log_info!("Pruned {removed} old diagnostic files");
        }
        removed
    }
}

fn prune_kind(dir: &Path, prefix: &str, keep: usize) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("cannot list {}", dir.display()))? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(prefix) || !entry.file_type()?.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        files.push((modified, name, entry.path()));
    }

    if files.len() <= keep {
        return Ok(0);
    }

    // Oldest first; the timestamp in the name breaks mtime ties.
    files.sort();
    let excess = files.len() - keep;
    let mut removed = 0;
    for (_, _, path) in files.into_iter().take(excess) {
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(err) => log_warn!("failed to remove {}: {err}", path.display()),
        }
    }
    Ok(removed)
}

fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
