//! Runtime configuration.
//!
//! Defaults put everything under `~/.school-manager/`. An optional
//! `config.toml` in that directory (or at a path given on the command line)
//! overrides individual paths and the log filter.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use serde::Deserialize;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".school-manager";
const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "school.db";
const SNAPSHOT_FILE_NAME: &str = "school.json";
const BACKUP_DIR_NAME: &str = "backups";
const LOG_FILE_NAME: &str = "school-manager.log";
const DEFAULT_LOG_LEVEL: &str = "school_manager=info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub backup_dir: PathBuf,
    pub log_path: PathBuf,
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_level: String,
}

/// Shape of `config.toml`. Every key is optional; relative paths resolve
/// against the data directory.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    database: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    backup_dir: Option<PathBuf>,
    log_file: Option<PathBuf>,
    log_level: Option<String>,
}

impl Config {
    /// Defaults rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            db_path: data_dir.join(DB_FILE_NAME),
            snapshot_path: data_dir.join(SNAPSHOT_FILE_NAME),
            backup_dir: data_dir.join(BACKUP_DIR_NAME),
            log_path: data_dir.join(LOG_FILE_NAME),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            data_dir,
        }
    }

    /// Resolve the data directory in the user's home, then layer the config
    /// file from `explicit` (must exist) or the default location (optional).
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
        let config = Self::with_data_dir(base_dirs.home_dir().join(DATA_DIR_NAME));

        match explicit {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                config.merge_toml(&text)
            }
            None => {
                let path = config.data_dir.join(CONFIG_FILE_NAME);
                match fs::read_to_string(&path) {
                    Ok(text) => config.merge_toml(&text),
                    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(config),
                    Err(err) => Err(err)
                        .with_context(|| format!("failed to read config {}", path.display())),
                }
            }
        }
    }

    /// Apply overrides from TOML text.
    pub fn merge_toml(mut self, text: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(text).context("failed to parse config")?;

        if let Some(path) = file.database {
            self.db_path = self.resolve(path);
        }
        if let Some(path) = file.snapshot {
            self.snapshot_path = self.resolve(path);
        }
        if let Some(path) = file.backup_dir {
            self.backup_dir = self.resolve(path);
        }
        if let Some(path) = file.log_file {
            self.log_path = self.resolve(path);
        }
        if let Some(level) = file.log_level {
            self.log_level = level;
        }
        Ok(self)
    }

    fn resolve(&self, path: PathBuf) -> PathBuf {
        if path.is_absolute() {
            path
        } else {
            self.data_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_live_in_data_dir() {
        let config = Config::with_data_dir("/tmp/school");
        assert_eq!(config.db_path, Path::new("/tmp/school/school.db"));
        assert_eq!(config.snapshot_path, Path::new("/tmp/school/school.json"));
        assert_eq!(config.backup_dir, Path::new("/tmp/school/backups"));
        assert_eq!(config.log_level, "school_manager=info");
    }

    #[test]
    fn toml_overrides_resolve_relative_paths() {
        let config = Config::with_data_dir("/tmp/school")
            .merge_toml(
                r#"
                database = "term1.db"
                backup_dir = "/var/backups/school"
                log_level = "school_manager=debug"
                "#,
            )
            .unwrap();
        assert_eq!(config.db_path, Path::new("/tmp/school/term1.db"));
        assert_eq!(config.backup_dir, Path::new("/var/backups/school"));
        assert_eq!(config.snapshot_path, Path::new("/tmp/school/school.json"));
        assert_eq!(config.log_level, "school_manager=debug");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = Config::with_data_dir("/tmp/school").merge_toml("colour = \"blue\"");
        assert!(result.is_err());
    }
}
