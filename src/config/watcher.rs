//! Rules file watcher for hot reload
//!
//! Watches the directory holding the rules file (so editors that replace
//! the file by rename are still seen) and reloads the [`RuleStore`] after
//! each burst of write events. A failed reload is logged and the previous
//! rules stay active.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::error::{ConfigError, Result};
use super::loader::load_rules;
use crate::rules::RuleStore;

/// Quiet period that ends a burst of events
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Longest a steady stream of events can hold a reload back
const MAX_DEBOUNCE: Duration = Duration::from_millis(500);

/// Load `path` and swap it into `store`
///
/// On failure the store is left untouched.
pub fn reload(path: &Path, store: &RuleStore) -> Result<usize> {
    let rules = load_rules(path)?;
    Ok(store.replace(rules))
}

/// Keeps the rules file watched for as long as it lives
pub struct RulesWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

impl RulesWatcher {
    /// Start watching `path`, reloading into `store` on every write
    ///
    /// Fails if the file does not exist or the watch cannot be registered.
    pub fn spawn(path: &Path, store: Arc<RuleStore>) -> Result<Self> {
        let file = path
            .canonicalize()
            .map_err(|e| ConfigError::Watch(format!("{}: {}", path.display(), e)))?;
        let dir = file
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| ConfigError::Watch(format!("{} has no parent directory", file.display())))?;

        let (tx, rx) = mpsc::channel::<()>();
        let target = file.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if is_write(&event.kind) && event.paths.iter().any(|p| p == &target) {
                    let _ = tx.send(());
                }
            }
            Err(e) => warn!("Rules watch error: {}", e),
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let worker_path = file.clone();
        thread::Builder::new()
            .name("rules-watcher".to_string())
            .spawn(move || reload_loop(&worker_path, &store, rx))
            .map_err(|e| ConfigError::Watch(e.to_string()))?;

        Ok(Self {
            path: file,
            _watcher: watcher,
        })
    }

    /// Canonical path of the watched file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_write(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Modify(_) | EventKind::Create(_))
}

// Runs until the watcher is dropped and the channel disconnects.
fn reload_loop(path: &Path, store: &RuleStore, rx: mpsc::Receiver<()>) {
    while rx.recv().is_ok() {
        if !wait_for_quiet(&rx, Instant::now() + MAX_DEBOUNCE) {
            return;
        }

        match reload(path, store) {
            Ok(count) => info!("TCP configuration reloaded. Rules: {}", count),
            Err(e) => error!("Failed to reload rules: {}. Keeping current rules.", e),
        }
    }
    debug!("Rules watcher for {} stopped", path.display());
}

/// Swallow events until `DEBOUNCE` passes without one or `deadline` is hit
///
/// Returns false once the sending side is gone.
fn wait_for_quiet(rx: &mpsc::Receiver<()>, deadline: Instant) -> bool {
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return true;
        }
        match rx.recv_timeout(DEBOUNCE.min(left)) {
            Ok(()) => continue,
            Err(RecvTimeoutError::Timeout) => return true,
            Err(RecvTimeoutError::Disconnected) => return false,
        }
    }
}
