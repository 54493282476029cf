use std::path::PathBuf;

use thiserror::Error;

/// Main error type for ragsync
#[derive(Error, Debug)]
pub enum RagsyncError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A single file could not be opened or read while hashing
    #[error("Unreadable file {}: {source}", path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted manifest exists but is not a valid manifest document
    #[error("Corrupt manifest {}: {source}", path.display())]
    CorruptManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The manifest could not be written; the previous file is left in place
    #[error("Failed to persist manifest {}: {source}", path.display())]
    PersistFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The file watcher could not be started or stopped unexpectedly
    #[error("Watch error: {0}")]
    Watch(String),
}

/// Convenient Result type using RagsyncError
pub type Result<T> = std::result::Result<T, RagsyncError>;
