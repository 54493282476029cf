use rayon::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::error::{RagsyncError, Result};
use crate::ingest::compute_file_hash;
use crate::manifest::CurrentHashMap;

/// What the scanner tracks under a root.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub recursive: bool,
    /// Lowercase extensions without the leading dot. Empty tracks every file.
    pub extensions: Vec<String>,
    pub ignore: Vec<Regex>,
    /// Relative keys never reported (e.g. the manifest itself when stored under the root).
    pub excluded: HashSet<String>,
    /// Key prefixes never reported, e.g. `state/.manifest.json.` for the manifest's temp files.
    pub excluded_prefixes: Vec<String>,
    pub parallel: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            extensions: Vec::new(),
            ignore: Vec::new(),
            excluded: HashSet::new(),
            excluded_prefixes: Vec::new(),
            parallel: true,
        }
    }
}

impl ScanOptions {
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        let ignore = config
            .ignore_patterns
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| RagsyncError::Config(format!("invalid ignore pattern {:?}: {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            recursive: config.recursive,
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            ignore,
            excluded: HashSet::new(),
            excluded_prefixes: Vec::new(),
            parallel: config.parallel,
        })
    }

    /// Whether a relative key passes the extension, ignore and exclusion filters.
    pub fn tracks(&self, key: &str) -> bool {
        if self.excluded.contains(key) || self.excluded_prefixes.iter().any(|p| key.starts_with(p.as_str())) {
            return false;
        }

        if !self.recursive && key.contains('/') {
            return false;
        }

        if !self.extensions.is_empty() {
            let extension = Path::new(key)
                .extension()
                .and_then(|s| s.to_str())
                .unwrap_or("")
                .to_lowercase();
            if !self.extensions.iter().any(|e| *e == extension) {
                return false;
            }
        }

        !self.ignore.iter().any(|re| re.is_match(key))
    }
}

/// Result of one scan: the current hash map plus files that could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scan {
    pub hashes: CurrentHashMap,
    /// Relative keys that were found but failed to hash. They are absent from `hashes`.
    pub unreadable: Vec<String>,
}

/// Forward-slash key of `path` relative to `root`.
///
/// Returns `None` when `path` is not under `root`, is `root` itself, or has a
/// component that is not valid UTF-8.
pub fn relative_key(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut segments = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(s) => segments.push(s.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

/// Scan `root` with default options: every regular file at the top level.
pub fn scan_data_directory(root: &Path) -> CurrentHashMap {
    scan(root, &ScanOptions::default()).hashes
}

/// Hash every tracked regular file under `root`.
///
/// A root that does not exist or is not a directory scans as empty. Files that cannot
/// be read (including dangling symlinks) are logged and left out, so a previously
/// tracked unreadable file shows up as deleted until it can be read again.
pub fn scan(root: &Path, options: &ScanOptions) -> Scan {
    if !root.is_dir() {
        log::warn!(
            "Data directory {} does not exist or is not a directory; treating as empty",
            root.display()
        );
        return Scan::default();
    }

    let max_depth = if options.recursive { usize::MAX } else { 1 };
    let mut candidates: Vec<(String, PathBuf)> = Vec::new();
    let mut unreadable: Vec<String> = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                if let Some(key) = unreadable_file_key(&e, root, options) {
                    unreadable.push(key);
                }
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(key) = relative_key(entry.path(), root) else {
            log::warn!("Skipping file with non UTF-8 name: {}", entry.path().display());
            continue;
        };

        if !options.tracks(&key) {
            continue;
        }

        candidates.push((key, entry.into_path()));
    }

    let mut scan = hash_candidates(candidates, options.parallel);
    scan.unreadable.extend(unreadable);
    scan.unreadable.sort();
    log::info!(
        "Scanned {} files in {} ({} unreadable)",
        scan.hashes.len(),
        root.display(),
        scan.unreadable.len()
    );
    scan
}

/// Key of a walk error that refers to a tracked file rather than a directory.
///
/// Symlink loops and directory failures yield `None`.
fn unreadable_file_key(err: &walkdir::Error, root: &Path, options: &ScanOptions) -> Option<String> {
    if err.loop_ancestor().is_some() {
        return None;
    }
    let path = err.path()?;
    let meta = std::fs::symlink_metadata(path).ok()?;
    if meta.is_dir() {
        return None;
    }
    let key = relative_key(path, root)?;
    options.tracks(&key).then_some(key)
}

fn hash_candidates(candidates: Vec<(String, PathBuf)>, parallel: bool) -> Scan {
    let hash_one = |(key, path): (String, PathBuf)| {
        let result = compute_file_hash(&path);
        (key, result)
    };

    let results: Vec<(String, Result<String>)> = if parallel {
        candidates.into_par_iter().map(hash_one).collect()
    } else {
        candidates.into_iter().map(hash_one).collect()
    };

    let mut scan = Scan::default();
    for (key, result) in results {
        match result {
            Ok(hash) => {
                scan.hashes.insert(key, hash);
            }
            Err(e) => {
                log::warn!("{}; omitting {} from this scan", e, key);
                scan.unreadable.push(key);
            }
        }
    }
    scan
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn options(f: impl FnOnce(&mut ScanOptions)) -> ScanOptions {
        let mut o = ScanOptions::default();
        f(&mut o);
        o
    }

    #[test]
    fn test_scan_single_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file1.txt");
        fs::write(&file, "Hello").unwrap();

        let hashes = scan_data_directory(temp_dir.path());
        assert_eq!(hashes.len(), 1);
        assert_eq!(hashes.get("file1.txt"), Some(&compute_file_hash(&file).unwrap()));
    }

    #[test]
    fn test_scan_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
        fs::write(temp_dir.path().join("b.bin"), [0u8, 1, 2]).unwrap();
        fs::write(temp_dir.path().join("c.md"), "# c").unwrap();

        let first = scan_data_directory(temp_dir.path());
        let second = scan_data_directory(temp_dir.path());
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let hashes = scan_data_directory(&temp_dir.path().join("missing"));
        assert!(hashes.is_empty());
    }

    #[test]
    fn test_scan_root_that_is_a_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        assert!(scan_data_directory(&file).is_empty());
    }

    #[test]
    fn test_scan_top_level_only_by_default() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::write(root.join("top.txt"), "top").unwrap();
        fs::write(root.join("sub/doc.txt"), "doc").unwrap();
        fs::write(root.join("sub/deeper/leaf.txt"), "leaf").unwrap();

        let hashes = scan_data_directory(root);
        assert_eq!(hashes.keys().collect::<Vec<_>>(), vec!["top.txt"]);
    }

    #[test]
    fn test_scan_recursive_uses_forward_slash_keys() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::write(root.join("top.txt"), "top").unwrap();
        fs::write(root.join("sub/doc.txt"), "doc").unwrap();
        fs::write(root.join("sub/deeper/leaf.txt"), "leaf").unwrap();

        let scan = scan(root, &options(|o| o.recursive = true));
        assert_eq!(
            scan.hashes.keys().collect::<Vec<_>>(),
            vec!["sub/deeper/leaf.txt", "sub/doc.txt", "top.txt"]
        );
    }

    #[test]
    fn test_scan_extension_filter_is_case_insensitive() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("B.TXT"), "b").unwrap();
        fs::write(root.join("image.png"), b"\x89PNG\r\n\x1a\n").unwrap();
        fs::write(root.join("noext"), "n").unwrap();

        let config = ScanConfig {
            extensions: vec![".txt".to_string()],
            ..ScanConfig::default()
        };
        let scan = scan(root, &ScanOptions::from_config(&config).unwrap());
        assert_eq!(scan.hashes.keys().collect::<Vec<_>>(), vec!["B.TXT", "a.txt"]);
    }

    #[test]
    fn test_scan_ignore_patterns_and_exclusions() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("keep.txt"), "k").unwrap();
        fs::write(root.join("draft.txt~"), "d").unwrap();
        fs::write(root.join("manifest.json"), "{}").unwrap();
        fs::write(root.join(".manifest.json.x1Y2z3.tmp"), "{").unwrap();

        let mut opts = ScanOptions::from_config(&ScanConfig {
            ignore_patterns: vec!["~$".to_string()],
            ..ScanConfig::default()
        })
        .unwrap();
        opts.excluded.insert("manifest.json".to_string());
        opts.excluded_prefixes.push(".manifest.json.".to_string());

        let scan = scan(root, &opts);
        assert_eq!(scan.hashes.keys().collect::<Vec<_>>(), vec!["keep.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_reported_unreadable() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("ok.txt"), "ok").unwrap();
        std::os::unix::fs::symlink(root.join("missing-target.txt"), root.join("broken.txt")).unwrap();

        let scan = scan(root, &ScanOptions::default());
        assert_eq!(scan.hashes.keys().collect::<Vec<_>>(), vec!["ok.txt"]);
        assert_eq!(scan.unreadable, vec!["broken.txt".to_string()]);
    }

    #[test]
    fn test_sequential_and_parallel_scans_agree() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..20 {
            fs::write(temp_dir.path().join(format!("f{}.txt", i)), format!("content {}", i)).unwrap();
        }
        let seq = scan(temp_dir.path(), &options(|o| o.parallel = false));
        let par = scan(temp_dir.path(), &options(|o| o.parallel = true));
        assert_eq!(seq, par);
        assert_eq!(par.hashes.len(), 20);
    }

    #[test]
    fn test_unreadable_file_is_omitted_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good.txt");
        fs::write(&good, "fine").unwrap();

        let scan = hash_candidates(
            vec![
                ("good.txt".to_string(), good.clone()),
                ("vanished.txt".to_string(), temp_dir.path().join("vanished.txt")),
            ],
            false,
        );
        assert_eq!(scan.hashes.len(), 1);
        assert!(scan.hashes.contains_key("good.txt"));
        assert_eq!(scan.unreadable, vec!["vanished.txt".to_string()]);
    }

    #[test]
    fn test_relative_key() {
        let root = Path::new("/data/docs");
        assert_eq!(relative_key(Path::new("/data/docs/a.txt"), root), Some("a.txt".to_string()));
        assert_eq!(
            relative_key(Path::new("/data/docs/sub/b.md"), root),
            Some("sub/b.md".to_string())
        );
        assert_eq!(relative_key(Path::new("/data/other/a.txt"), root), None);
        assert_eq!(relative_key(root, root), None);
    }

    #[test]
    fn test_invalid_ignore_pattern() {
        let err = ScanOptions::from_config(&ScanConfig {
            ignore_patterns: vec!["[".to_string()],
            ..ScanConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, RagsyncError::Config(_)));
    }
}
