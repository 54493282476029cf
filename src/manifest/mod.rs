//! The manifest: persisted record of which files were processed, and with what content.
//!
//! A [`Manifest`] maps a forward-slash relative path to a [`FileRecord`]. It is the only
//! durable state between ingestion runs; the filesystem is the only source of the current
//! state, observed as a [`CurrentHashMap`] by the scanner.

mod store;
mod update;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use store::ManifestStore;
pub use update::{
    remove_metadata_for_deleted_files, update_metadata_after_processing,
    update_metadata_after_processing_at,
};

/// Freshly computed `relative_path -> content_hash` for one scan. Never persisted directly.
pub type CurrentHashMap = BTreeMap<String, String>;

/// One tracked file as of its last successful processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Hex SHA-256 of the file's bytes.
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            processed_at: None,
        }
    }
}

/// Mapping from relative path to [`FileRecord`].
///
/// Serialized as a bare JSON object keyed by path, sorted, e.g.
/// `{"notes.txt": {"hash": "…", "processed_at": "…"}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    files: BTreeMap<String, FileRecord>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, relative_path: &str) -> Option<&FileRecord> {
        self.files.get(relative_path)
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.files.contains_key(relative_path)
    }

    /// Stored hash for a path, if tracked.
    pub fn hash_of(&self, relative_path: &str) -> Option<&str> {
        self.files.get(relative_path).map(|r| r.hash.as_str())
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.files.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FileRecord)> {
        self.files.iter()
    }

    /// Insert or replace a record, returning the previous one.
    pub fn insert(&mut self, relative_path: impl Into<String>, record: FileRecord) -> Option<FileRecord> {
        self.files.insert(relative_path.into(), record)
    }

    pub fn remove(&mut self, relative_path: &str) -> Option<FileRecord> {
        self.files.remove(relative_path)
    }
}

impl FromIterator<(String, FileRecord)> for Manifest {
    fn from_iter<T: IntoIterator<Item = (String, FileRecord)>>(iter: T) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}
