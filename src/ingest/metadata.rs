use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{RagsyncError, Result};

/// Compute the SHA256 hash of a file's contents as 64 lowercase hex chars.
///
/// The file is streamed through the hasher, so large files are not loaded at once.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let unreadable = |source: std::io::Error| RagsyncError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(unreadable)?;
    let mut reader = BufReader::with_capacity(64 * 1024, file);
    let mut hasher = Sha256::new();
    std::io::copy(&mut reader, &mut hasher).map_err(unreadable)?;
    Ok(format!("{:x}", hasher.finalize()))
}
