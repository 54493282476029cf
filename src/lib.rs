pub mod config;
pub mod error;
pub mod ingest;
pub mod manifest;
pub mod watch;

pub use config::Config;
pub use error::{RagsyncError, Result};
pub use ingest::{get_changed_files, scan_data_directory, ChangeSet, DocumentSink, IngestRun};
pub use manifest::{
    remove_metadata_for_deleted_files, update_metadata_after_processing, CurrentHashMap, FileRecord,
    Manifest, ManifestStore,
};
