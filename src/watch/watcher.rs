//! Watcher thread: notify + debounce, send batches of settled paths to main.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{RecursiveMode, Watcher};

use crate::error::RagsyncError;

/// Watch `root` and send debounced batches of absolute paths over `tx`.
///
/// A path is sent once no new event for it arrived for `debounce_ms`. The thread exits
/// when the receiver is dropped or the notify channel disconnects.
pub fn run_watcher_thread(
    root: &Path,
    recursive: bool,
    debounce_ms: u64,
    tx: mpsc::Sender<Vec<PathBuf>>,
) -> crate::error::Result<()> {
    let debounce = Duration::from_millis(debounce_ms);

    let (event_tx, event_rx) = mpsc::channel::<Vec<PathBuf>>();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(ev) => {
                let _ = event_tx.send(ev.paths);
            }
            Err(e) => log::warn!("watch event error: {}", e),
        }
    })
    .map_err(|e| RagsyncError::Watch(e.to_string()))?;

    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    watcher
        .watch(root, mode)
        .map_err(|e| RagsyncError::Watch(e.to_string()))?;

    let mut pending: HashMap<PathBuf, Instant> = HashMap::new();

    loop {
        match event_rx.recv_timeout(debounce) {
            Ok(paths) => {
                let now = Instant::now();
                for p in paths {
                    pending.insert(p, now);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let now = Instant::now();
                let ready: Vec<PathBuf> = pending
                    .iter()
                    .filter(|(_, t)| now.duration_since(**t) >= debounce)
                    .map(|(p, _)| p.clone())
                    .collect();
                if ready.is_empty() {
                    continue;
                }
                for p in &ready {
                    pending.remove(p);
                }
                if tx.send(ready).is_err() {
                    return Ok(());
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}
