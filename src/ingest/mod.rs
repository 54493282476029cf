pub mod walker;
pub mod metadata;
pub mod incremental;
pub mod pipeline;

pub use walker::{relative_key, scan, scan_data_directory, Scan, ScanOptions};
pub use incremental::{force_all_changed, get_changed_files, ChangeSet};
pub use metadata::compute_file_hash;
pub use pipeline::{DocumentSink, IngestRun, MarkProcessed, RunPlan, RunReport};
