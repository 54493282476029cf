//! Pure manifest transitions. Each function returns a new [`Manifest`]; inputs are never
//! mutated, so the previous manifest stays stable for the rest of the run.

use chrono::{DateTime, Utc};

use crate::manifest::{CurrentHashMap, FileRecord, Manifest};

/// Record `processed_paths` as up to date with their hash from `current`.
///
/// Pass only paths that the indexing pipeline processed successfully; anything passed
/// here is treated as current from now on.
pub fn update_metadata_after_processing<I, S>(
    processed_paths: I,
    current: &CurrentHashMap,
    previous: &Manifest,
) -> Manifest
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    update_metadata_after_processing_at(processed_paths, current, previous, Utc::now())
}

/// Same as [`update_metadata_after_processing`] with an explicit processing timestamp.
pub fn update_metadata_after_processing_at<I, S>(
    processed_paths: I,
    current: &CurrentHashMap,
    previous: &Manifest,
    processed_at: DateTime<Utc>,
) -> Manifest
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut next = previous.clone();

    for path in processed_paths {
        let path = path.as_ref();
        match current.get(path) {
            Some(hash) => {
                next.insert(
                    path,
                    FileRecord {
                        hash: hash.clone(),
                        processed_at: Some(processed_at),
                    },
                );
            }
            None => {
                // Vanished or became unreadable between scan and update.
                log::warn!("Processed path {} is not in the current scan; manifest entry left as is", path);
            }
        }
    }

    next
}

/// Drop every path in `deleted_paths` from the manifest. Untracked paths are ignored.
pub fn remove_metadata_for_deleted_files<I, S>(deleted_paths: I, previous: &Manifest) -> Manifest
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut next = previous.clone();
    for path in deleted_paths {
        next.remove(path.as_ref());
    }
    next
}
