use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ragsync: RagsyncConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Locations of the tracked root and the persisted manifest
#[derive(Debug, Clone, Deserialize)]
pub struct RagsyncConfig {
    /// Root directory whose files are tracked.
    /// Does not need to exist yet; a missing root scans as empty.
    pub data_dir: PathBuf,
    /// Where the manifest JSON document is persisted between runs.
    pub manifest_path: PathBuf,
    /// Default log filter for the binaries; `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Directory scanner configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Walk sub-directories too. Off by default: only the top level is tracked.
    #[serde(default)]
    pub recursive: bool,
    /// File extensions to track (case-insensitive, leading dot optional).
    /// Empty tracks every regular file.
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Regexes matched against the forward-slash relative path; matches are skipped.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            extensions: Vec::new(),
            ignore_patterns: Vec::new(),
            parallel: default_parallel(),
        }
    }
}

fn default_parallel() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in RAGSYNC_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("RAGSYNC_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Failed to parse config.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.ragsync.manifest_path.as_os_str().is_empty() {
            anyhow::bail!("ragsync.manifest_path must not be empty");
        }

        if self.ragsync.manifest_path.is_dir() {
            anyhow::bail!(
                "ragsync.manifest_path must be a file, not a directory: {}",
                self.ragsync.manifest_path.display()
            );
        }

        if self.ragsync.log_level.parse::<log::LevelFilter>().is_err() {
            anyhow::bail!(
                "ragsync.log_level must be one of off, error, warn, info, debug, trace; got {:?}",
                self.ragsync.log_level
            );
        }

        if self.ragsync.data_dir.as_os_str().is_empty() {
            anyhow::bail!("ragsync.data_dir must not be empty");
        }

        for pattern in &self.scan.ignore_patterns {
            regex::Regex::new(pattern)
                .with_context(|| format!("scan.ignore_patterns: invalid regex {:?}", pattern))?;
        }

        if self.scan.extensions.iter().any(|e| e.trim_start_matches('.').is_empty()) {
            anyhow::bail!("scan.extensions must not contain empty entries");
        }

        Ok(())
    }

    /// Get the tracked root directory
    pub fn data_dir(&self) -> &Path {
        &self.ragsync.data_dir
    }

    /// Get the manifest file path
    pub fn manifest_path(&self) -> &Path {
        &self.ragsync.manifest_path
    }

    /// Log filter used when `RUST_LOG` is not set
    pub fn log_level(&self) -> &str {
        &self.ragsync.log_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const MINIMAL: &str = r#"
[ragsync]
data_dir = "./data"
manifest_path = "./state/manifest.json"
"#;

    fn with_config_env(config_path: &Path, f: impl FnOnce()) {
        let original = std::env::var("RAGSYNC_CONFIG").ok();
        std::env::set_var("RAGSYNC_CONFIG", config_path.to_str().unwrap());
        f();
        std::env::remove_var("RAGSYNC_CONFIG");
        if let Some(val) = original {
            std::env::set_var("RAGSYNC_CONFIG", val);
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.data_dir(), Path::new("./data"));
        assert_eq!(config.manifest_path(), Path::new("./state/manifest.json"));
        assert_eq!(config.log_level(), "info");
        assert!(!config.scan.recursive);
        assert!(config.scan.extensions.is_empty());
        assert!(config.scan.parallel);
    }

    #[test]
    fn test_config_scan_section() {
        let config = Config::from_toml_str(
            r#"
[ragsync]
data_dir = "./docs"
manifest_path = "manifest.json"
log_level = "debug"

[scan]
recursive = true
extensions = [".txt", "md"]
ignore_patterns = ["^drafts/", "~$"]
parallel = false
"#,
        )
        .unwrap();
        assert!(config.scan.recursive);
        assert_eq!(config.scan.extensions, vec![".txt", "md"]);
        assert_eq!(config.scan.ignore_patterns.len(), 2);
        assert!(!config.scan.parallel);
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn test_config_invalid_log_level() {
        let err = Config::from_toml_str(
            "[ragsync]\ndata_dir = \"./data\"\nmanifest_path = \"m.json\"\nlog_level = \"loud\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn test_config_invalid_regex() {
        let err = Config::from_toml_str(
            r#"
[ragsync]
data_dir = "./data"
manifest_path = "manifest.json"

[scan]
ignore_patterns = ["(unclosed"]
"#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("ignore_patterns"));
    }

    #[test]
    fn test_config_manifest_path_is_directory() {
        let temp_dir = TempDir::new().unwrap();
        let toml_str = format!(
            "[ragsync]\ndata_dir = \"./data\"\nmanifest_path = {:?}\n",
            temp_dir.path().to_str().unwrap()
        );
        let err = Config::from_toml_str(&toml_str).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_config_missing_data_dir_is_allowed() {
        let toml_str = "[ragsync]\ndata_dir = \"./does/not/exist\"\nmanifest_path = \"m.json\"\n";
        assert!(Config::from_toml_str(toml_str).is_ok());
    }

    #[test]
    fn test_config_load_from_env_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("ragsync.toml");
        fs::write(&config_path, MINIMAL).unwrap();
        with_config_env(&config_path, || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            assert_eq!(config.unwrap().manifest_path(), Path::new("./state/manifest.json"));
        });
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        with_config_env(Path::new("nonexistent.toml"), || {
            let config = Config::load();
            assert!(config.is_err());
            assert!(config.unwrap_err().to_string().contains("nonexistent.toml"));
        });
    }
}
