//! Incremental ingestion: classify paths by comparing fresh content hashes with the manifest.
//!
//! Only new and modified files need to go through the indexing pipeline again; deleted
//! files need to be evicted from it. Unchanged files are counted and skipped.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::manifest::{CurrentHashMap, Manifest};

/// Classification of every path seen in either the current scan or the manifest.
///
/// `new`, `modified` and `deleted` are pairwise disjoint; unchanged paths are only counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// In the current scan, not in the manifest.
    pub new: BTreeSet<String>,
    /// In both, with a different hash.
    pub modified: BTreeSet<String>,
    /// In the manifest, not in the current scan.
    pub deleted: BTreeSet<String>,
    /// In both, with the same hash.
    pub unchanged: usize,
}

impl ChangeSet {
    /// True when nothing needs indexing or eviction.
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Paths the indexing pipeline must (re)process: `new ∪ modified`.
    pub fn to_process(&self) -> impl Iterator<Item = &String> {
        self.new.iter().chain(self.modified.iter())
    }

    pub fn to_process_count(&self) -> usize {
        self.new.len() + self.modified.len()
    }
}

/// Classify `current` against `previous` into new, modified and deleted paths.
pub fn get_changed_files(current: &CurrentHashMap, previous: &Manifest) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for (path, hash) in current {
        match previous.hash_of(path) {
            None => {
                log::debug!("new: {}", path);
                changes.new.insert(path.clone());
            }
            Some(stored) if stored != hash.as_str() => {
                log::debug!("modified: {}", path);
                changes.modified.insert(path.clone());
            }
            Some(_) => changes.unchanged += 1,
        }
    }

    for path in previous.paths() {
        if !current.contains_key(path) {
            log::debug!("deleted: {}", path);
            changes.deleted.insert(path.clone());
        }
    }

    changes
}

/// Like [`get_changed_files`], but every path present in both is scheduled as modified
/// regardless of its hash. Used to force a full re-index.
pub fn force_all_changed(current: &CurrentHashMap, previous: &Manifest) -> ChangeSet {
    let mut changes = get_changed_files(current, previous);
    for path in current.keys() {
        if previous.contains(path) {
            changes.modified.insert(path.clone());
        }
    }
    changes.unchanged = 0;
    changes
}
