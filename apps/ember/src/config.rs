use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use ember_backup::BackupConfig;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "ember.toml";
const BACKUP_DIR_ENV: &str = "EMBER_BACKUP_DIR";

#[derive(Debug, Default, Deserialize)]
struct EmberConfig {
    #[serde(default)]
    backup: Option<BackupConfig>,
}

/// Loads the `[backup]` table of the server's config file.
///
/// An explicitly named file must exist; the default `ember.toml` may be
/// missing. Relative paths resolve against `root`.
pub fn load_backup_config(root: &Path, explicit: Option<&Path>) -> Result<BackupConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.join(CONFIG_FILE));

    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => Some(contents),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => None,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            bail!("config file not found at {}", path.display());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    let config = match contents {
        Some(contents) => parse_backup_config(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?,
        None => BackupConfig::default(),
    };

    Ok(resolve_backup_config(
        root,
        config,
        std::env::var(BACKUP_DIR_ENV).ok(),
    ))
}

fn parse_backup_config(contents: &str) -> Result<BackupConfig> {
    let config: EmberConfig = toml::from_str(contents)?;
    Ok(config.backup.unwrap_or_default())
}

fn resolve_backup_config(
    root: &Path,
    mut config: BackupConfig,
    backup_dir_override: Option<String>,
) -> BackupConfig {
    if let Some(dir) = normalize_optional(backup_dir_override) {
        config.backup_dir = PathBuf::from(dir);
    }
    config.backup_dir = resolve_against(root, &config.backup_dir);
    config.worlds_dir = resolve_against(root, &config.worlds_dir);
    config
}

fn resolve_against(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|val| {
        let trimmed = val.trim().to_string();
        if trimmed.is_empty() { None } else { Some(trimmed) }
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_backup_config, resolve_backup_config};
    use ember_backup::BackupConfig;
    use std::path::{Path, PathBuf};

    #[test]
    fn missing_table_uses_defaults() {
        let config = parse_backup_config("[server]\nname = \"lobby\"\n").expect("parse");
        assert_eq!(config.backup_dir, PathBuf::from("backup"));
        assert_eq!(config.marker_files, vec!["level.dat", "level_sponge.dat"]);
        assert_eq!(config.compression_level, 6);
    }

    #[test]
    fn backup_table_overrides_fields() {
        let config = parse_backup_config(
            "[backup]\nbackup_dir = \"/mnt/backups\"\nmarker_files = [\"level.dat\"]\ncompression_level = 1\n",
        )
        .expect("parse");
        assert_eq!(config.backup_dir, PathBuf::from("/mnt/backups"));
        assert_eq!(config.worlds_dir, PathBuf::from("."));
        assert_eq!(config.marker_files, vec!["level.dat"]);
        assert_eq!(config.compression_level, 1);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(parse_backup_config("[backup]\ncompression_level = \"high\"\n").is_err());
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let root = Path::new("/srv/mc");
        let config = resolve_backup_config(root, BackupConfig::default(), None);
        assert_eq!(config.backup_dir, PathBuf::from("/srv/mc/backup"));
        assert_eq!(config.worlds_dir, PathBuf::from("/srv/mc/."));
    }

    #[test]
    fn env_override_wins_when_not_blank() {
        let root = Path::new("/srv/mc");
        let config = resolve_backup_config(
            root,
            BackupConfig::default(),
            Some(" /var/backups ".to_string()),
        );
        assert_eq!(config.backup_dir, PathBuf::from("/var/backups"));

        let config = resolve_backup_config(root, BackupConfig::default(), Some("  ".to_string()));
        assert_eq!(config.backup_dir, PathBuf::from("/srv/mc/backup"));
    }
}
