use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::BackupError;

/// Marker files a directory must contain before a restore may delete it.
pub const DEFAULT_MARKER_FILES: &[&str] = &["level.dat", "level_sponge.dat"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
    #[serde(default = "default_worlds_dir")]
    pub worlds_dir: PathBuf,
    #[serde(default = "default_marker_files")]
    pub marker_files: Vec<String>,
    #[serde(default = "default_compression_level")]
    pub compression_level: i64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backup_dir: default_backup_dir(),
            worlds_dir: default_worlds_dir(),
            marker_files: default_marker_files(),
            compression_level: default_compression_level(),
        }
    }
}

impl BackupConfig {
    pub fn validate(&self) -> Result<(), BackupError> {
        if self.marker_files.iter().all(|name| name.trim().is_empty()) {
            return Err(BackupError::InvalidConfig(
                "marker_files must name at least one file".to_string(),
            ));
        }
        if let Some(bad) = self
            .marker_files
            .iter()
            .find(|name| name.contains('/') || name.contains('\\'))
        {
            return Err(BackupError::InvalidConfig(format!(
                "marker file '{bad}' must be a bare file name"
            )));
        }
        if !(0..=9).contains(&self.compression_level) {
            return Err(BackupError::InvalidConfig(format!(
                "compression_level must be between 0 and 9, got {}",
                self.compression_level
            )));
        }
        Ok(())
    }
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("backup")
}

fn default_worlds_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_marker_files() -> Vec<String> {
    DEFAULT_MARKER_FILES.iter().map(|s| s.to_string()).collect()
}

fn default_compression_level() -> i64 {
    6
}
