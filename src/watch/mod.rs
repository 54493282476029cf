//! Watch the data directory and re-run change detection whenever it settles.
//!
//! Uses the notify crate to watch the tracked root and debounces events. Each batch that
//! touches a tracked path triggers a full plan (or, when committing, a full run), since a
//! fresh scan is the only source of the current state.

mod watcher;

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::JoinHandle;

use crate::error::{RagsyncError, Result};
use crate::ingest::{relative_key, IngestRun, MarkProcessed};

/// Whether an event path can affect the run's classification.
///
/// Paths outside the root and paths the scan options filter out (which include the
/// manifest and its temp files) are ignored.
pub fn is_relevant_path(path: &Path, run: &IngestRun) -> bool {
    let key = relative_key(path, run.root()).or_else(|| {
        let root = run.root().canonicalize().ok()?;
        relative_key(path, &root)
    });
    match key {
        Some(key) => run.options().tracks(&key),
        None => false,
    }
}

/// Plan once and log the outcome; with `commit`, also record the changes in the manifest.
pub fn sync_once(run: &IngestRun, commit: bool) -> Result<()> {
    if commit {
        let report = run.execute(&mut MarkProcessed)?;
        log::info!(
            "watch: recorded {} processed, {} evicted",
            report.indexed.len(),
            report.evicted.len()
        );
        return Ok(());
    }

    let plan = run.plan()?;
    if plan.changes.is_empty() {
        log::info!("watch: up to date ({} unchanged)", plan.changes.unchanged);
        return Ok(());
    }
    for path in &plan.changes.new {
        log::info!("watch: new {}", path);
    }
    for path in &plan.changes.modified {
        log::info!("watch: modified {}", path);
    }
    for path in &plan.changes.deleted {
        log::info!("watch: deleted {}", path);
    }
    Ok(())
}

/// Run the file watcher: spawn the watcher thread, then block on debounced batches and
/// call [`sync_once`] for each batch that touches a tracked path.
///
/// Returns once the watcher thread stops; an error from that thread is returned here.
pub fn run_watcher(run: &IngestRun, debounce_ms: u64, commit: bool) -> Result<()> {
    if !run.root().is_dir() {
        return Err(RagsyncError::Config(format!(
            "cannot watch {}: not a directory",
            run.root().display()
        )));
    }

    let root = run.root().to_path_buf();
    let recursive = run.options().recursive;
    let (tx, rx) = mpsc::channel();

    let handle = std::thread::spawn(move || watcher::run_watcher_thread(&root, recursive, debounce_ms, tx));

    sync_once(run, commit)?;
    drain_batches(run, commit, rx, handle)
}

fn drain_batches(
    run: &IngestRun,
    commit: bool,
    rx: mpsc::Receiver<Vec<PathBuf>>,
    handle: JoinHandle<Result<()>>,
) -> Result<()> {
    for batch in rx {
        if !batch.iter().any(|p| is_relevant_path(p, run)) {
            continue;
        }
        log::debug!("watch: {} path(s) settled", batch.len());
        if let Err(e) = sync_once(run, commit) {
            log::error!("watch: sync failed: {}", e);
        }
    }

    match handle.join() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            log::error!("watcher thread error: {}", e);
            Err(e)
        }
        Err(_) => Err(RagsyncError::Watch("watcher thread panicked".to_string())),
    }
}
