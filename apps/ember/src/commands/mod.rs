use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use ember_backup::{SnapshotManager, WorldsDirectory};
use tracing::info;

use crate::{config, server_properties};

pub mod list;
pub mod restore;
pub mod snapshot;

/// A server directory with its snapshot manager.
pub struct Server {
    pub root: PathBuf,
    pub manager: Arc<SnapshotManager>,
}

impl Server {
    pub fn open(root: &Path, config_path: Option<&Path>) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve server directory {}", root.display()))?;
        let config = config::load_backup_config(&root, config_path)?;
        let resolver = Arc::new(WorldsDirectory::new(&config.worlds_dir));
        let manager = SnapshotManager::new(&config, resolver)
            .context("Failed to open backup directory")?;
        info!(
            "worlds in {}, backups in {}",
            config.worlds_dir.display(),
            config.backup_dir.display()
        );
        Ok(Self {
            root,
            manager: Arc::new(manager),
        })
    }
}

/// The name given on the command line, or the server's `level-name`.
pub fn name_or_level_name(root: &Path, name: Option<String>) -> Result<String> {
    match name {
        Some(name) => Ok(name),
        None => {
            let level = server_properties::read_level_name(root)?;
            info!("no world named, using level-name '{}' from server.properties", level);
            Ok(level)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::name_or_level_name;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn explicit_name_wins_over_level_name() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("ember-commands-{nanos}"));
        std::fs::create_dir_all(&dir).expect("create dir");
        std::fs::write(dir.join("server.properties"), "level-name=Survival\n")
            .expect("write props");

        assert_eq!(
            name_or_level_name(&dir, Some("Lobby".to_string())).expect("explicit"),
            "Lobby"
        );
        assert_eq!(name_or_level_name(&dir, None).expect("default"), "Survival");
        let _ = std::fs::remove_dir_all(dir);
    }
}
