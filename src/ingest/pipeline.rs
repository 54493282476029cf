//! One ingestion run: scan → load → diff → index/evict → update → save.
//!
//! The indexing pipeline is plugged in through [`DocumentSink`]; this module never embeds
//! or indexes anything itself. Only paths the sink handled successfully are written back
//! to the manifest.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::ingest::incremental::{force_all_changed, get_changed_files, ChangeSet};
use crate::ingest::walker::{relative_key, scan, ScanOptions};
use crate::manifest::{
    remove_metadata_for_deleted_files, update_metadata_after_processing, CurrentHashMap, Manifest,
    ManifestStore,
};

/// Downstream consumer of a run's change set.
pub trait DocumentSink {
    /// (Re)index a new or modified document.
    fn index(&mut self, relative_path: &str, absolute_path: &Path) -> anyhow::Result<()>;

    /// Remove a deleted document from the index.
    fn evict(&mut self, relative_path: &str) -> anyhow::Result<()>;
}

/// Sink that accepts every path without doing anything.
///
/// For callers that processed the files out of band and only need the manifest brought
/// up to date.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkProcessed;

impl DocumentSink for MarkProcessed {
    fn index(&mut self, relative_path: &str, _absolute_path: &Path) -> anyhow::Result<()> {
        log::debug!("marked processed: {}", relative_path);
        Ok(())
    }

    fn evict(&mut self, relative_path: &str) -> anyhow::Result<()> {
        log::debug!("marked evicted: {}", relative_path);
        Ok(())
    }
}

/// Everything computed before any downstream work happens.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub current: CurrentHashMap,
    pub previous: Manifest,
    pub changes: ChangeSet,
    /// Files present on disk that could not be hashed this run.
    pub unreadable: Vec<String>,
}

impl RunPlan {
    /// The manifest after recording `indexed` as processed and dropping `evicted`.
    pub fn apply<S: AsRef<str>>(&self, indexed: &[S], evicted: &[S]) -> Manifest {
        let updated = update_metadata_after_processing(
            indexed.iter().map(|s| s.as_ref()),
            &self.current,
            &self.previous,
        );
        remove_metadata_for_deleted_files(evicted.iter().map(|s| s.as_ref()), &updated)
    }
}

/// Outcome of [`IngestRun::execute`].
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub new: usize,
    pub modified: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub indexed: Vec<String>,
    pub evicted: Vec<String>,
    /// `(relative_path, error)` for every sink call that failed.
    pub failed: Vec<(String, String)>,
    pub unreadable: Vec<String>,
    /// Whether a new manifest was written.
    pub saved: bool,
}

/// A tracked root paired with its manifest.
#[derive(Debug, Clone)]
pub struct IngestRun {
    root: PathBuf,
    store: ManifestStore,
    options: ScanOptions,
}

impl IngestRun {
    /// The manifest file and its temp siblings are excluded from the scan when they
    /// live under `root`.
    pub fn new(root: impl Into<PathBuf>, store: ManifestStore, mut options: ScanOptions) -> Self {
        let root = root.into();
        if let Some(key) = manifest_key(&root, store.path()) {
            log::debug!("Manifest {} is inside the data directory; excluding it", key);
            let dir = key.rsplit_once('/').map(|(dir, _)| format!("{}/", dir)).unwrap_or_default();
            options.excluded_prefixes.push(format!("{}{}", dir, store.temp_prefix()));
            options.excluded.insert(key);
        }
        Self { root, store, options }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.data_dir(),
            ManifestStore::new(config.manifest_path()),
            ScanOptions::from_config(&config.scan)?,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Scan, load and diff. Writes nothing.
    pub fn plan(&self) -> Result<RunPlan> {
        self.plan_with(get_changed_files)
    }

    /// Like [`plan`](Self::plan) but schedules every current file for processing.
    pub fn plan_forced(&self) -> Result<RunPlan> {
        self.plan_with(force_all_changed)
    }

    fn plan_with(&self, classify: fn(&CurrentHashMap, &Manifest) -> ChangeSet) -> Result<RunPlan> {
        let scan = scan(&self.root, &self.options);
        let previous = self.store.load()?;
        let changes = classify(&scan.hashes, &previous);

        log::info!(
            "Classification: new={}, modified={}, deleted={}, unchanged={}",
            changes.new.len(),
            changes.modified.len(),
            changes.deleted.len(),
            changes.unchanged
        );

        Ok(RunPlan {
            current: scan.hashes,
            previous,
            changes,
            unreadable: scan.unreadable,
        })
    }

    /// Plan a run and hand the change set to `sink`, then persist what succeeded.
    pub fn execute<S: DocumentSink + ?Sized>(&self, sink: &mut S) -> Result<RunReport> {
        let plan = self.plan()?;
        self.execute_plan(plan, sink)
    }

    /// Drive `sink` over an already computed plan and persist what succeeded.
    pub fn execute_plan<S: DocumentSink + ?Sized>(&self, plan: RunPlan, sink: &mut S) -> Result<RunReport> {
        let mut report = RunReport {
            new: plan.changes.new.len(),
            modified: plan.changes.modified.len(),
            deleted: plan.changes.deleted.len(),
            unchanged: plan.changes.unchanged,
            unreadable: plan.unreadable.clone(),
            ..RunReport::default()
        };

        let total = plan.changes.to_process_count();
        for (idx, path) in plan.changes.to_process().enumerate() {
            log::info!("[{}/{}] Processing: {}", idx + 1, total, path);
            match sink.index(path, &self.root.join(path)) {
                Ok(()) => report.indexed.push(path.clone()),
                Err(e) => {
                    log::error!("✗ {}: {:#}", path, e);
                    report.failed.push((path.clone(), format!("{:#}", e)));
                }
            }
        }

        for path in &plan.changes.deleted {
            match sink.evict(path) {
                Ok(()) => report.evicted.push(path.clone()),
                Err(e) => {
                    // Record stays, so the eviction is retried next run.
                    log::error!("✗ evict {}: {:#}", path, e);
                    report.failed.push((path.clone(), format!("{:#}", e)));
                }
            }
        }

        let next = plan.apply(&report.indexed, &report.evicted);
        if next != plan.previous {
            self.store.save(&next)?;
            report.saved = true;
        }

        log::info!(
            "Run complete: indexed={}, evicted={}, failed={}, unchanged={}",
            report.indexed.len(),
            report.evicted.len(),
            report.failed.len(),
            report.unchanged
        );
        if !report.unreadable.is_empty() {
            log::warn!("{} file(s) could not be read and were treated as absent", report.unreadable.len());
        }

        Ok(report)
    }
}

/// Relative key of the manifest under `root`, if it is stored there.
fn manifest_key(root: &Path, manifest_path: &Path) -> Option<String> {
    if let Some(key) = relative_key(manifest_path, root) {
        return Some(key);
    }
    // Paths may differ only by symlinks or `./`; compare resolved forms where possible.
    let root = root.canonicalize().ok()?;
    let parent = manifest_path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let manifest_path = parent.canonicalize().ok()?.join(manifest_path.file_name()?);
    relative_key(&manifest_path, &root)
}
