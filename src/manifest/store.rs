use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{RagsyncError, Result};
use crate::manifest::Manifest;

/// Owns reads and writes of the persisted manifest file.
///
/// The path is injected at construction so tests and callers can point it anywhere.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Prefix used for temp files written next to the manifest during [`save`](Self::save).
    pub fn temp_prefix(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "manifest".to_string());
        format!(".{}.", name)
    }

    /// Load the persisted manifest.
    ///
    /// A missing file is the first-run state and yields an empty manifest. A file that
    /// exists but does not parse is [`RagsyncError::CorruptManifest`]; it is never
    /// replaced by an empty manifest, which would reclassify every tracked file as new.
    /// Any other read failure (a directory at the path, permissions) is [`RagsyncError::Io`].
    pub fn load(&self) -> Result<Manifest> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!(
                    "No manifest at {}; starting from an empty manifest",
                    self.path.display()
                );
                return Ok(Manifest::new());
            }
            Err(e) => return Err(RagsyncError::Io(e)),
        };

        let manifest: Manifest = serde_json::from_slice(&bytes).map_err(|source| {
            RagsyncError::CorruptManifest {
                path: self.path.clone(),
                source,
            }
        })?;

        log::debug!("Loaded {} manifest entries from {}", manifest.len(), self.path.display());
        Ok(manifest)
    }

    /// Persist `manifest`, replacing any prior content.
    ///
    /// Writes a temp file in the same directory, syncs it, then renames it over the
    /// target, so a crash leaves either the old or the new manifest on disk.
    pub fn save(&self, manifest: &Manifest) -> Result<()> {
        let persist_err = |source: std::io::Error| RagsyncError::PersistFailure {
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(persist_err)?;

        let prefix = self.temp_prefix();
        let tmp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(&parent)
            .map_err(persist_err)?;

        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, manifest)
                .map_err(|e| persist_err(e.into()))?;
            writer.write_all(b"\n").map_err(persist_err)?;
            writer.flush().map_err(persist_err)?;
        }
        tmp.as_file().sync_all().map_err(persist_err)?;

        // On failure the temp file is dropped (and deleted); the target is untouched.
        tmp.persist(&self.path).map_err(|e| persist_err(e.error))?;

        // The rename is only durable once the directory entry is synced.
        #[cfg(unix)]
        std::fs::File::open(&parent)
            .and_then(|dir| dir.sync_all())
            .map_err(persist_err)?;

        log::debug!("Saved {} manifest entries to {}", manifest.len(), self.path.display());
        Ok(())
    }
}
