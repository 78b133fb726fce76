use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::config::BackupConfig;
use crate::enumerate::PathEnumerator;
use crate::errors::BackupError;
use crate::resolver::ContentRootResolver;
use crate::restore::{RestoreSummary, Restorer};
use crate::store::{BackupStore, StoredArchive, WORLDS_CATEGORY, validate_name};
use crate::writer::ArchiveWriter;


/// Where a snapshot ended up and what went into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLocation {
    pub path: PathBuf,
    pub entries: usize,
    pub bytes: u64,
}

/// Snapshots worlds into the backup store and restores them.
///
/// Construct one per server and share it (`Arc`) with whatever issues backup
/// commands. Calls against the same world name serialize on a per-name lock
/// in the store; calls against different names run independently. Both
/// operations block on disk I/O, so async callers should go through
/// [`SnapshotManager::snapshot_async`] and [`SnapshotManager::restore_async`].
pub struct SnapshotManager {
    store: BackupStore,
    worlds_dir: PathBuf,
    resolver: Arc<dyn ContentRootResolver>,
    writer: ArchiveWriter,
    restorer: Restorer,
}

impl SnapshotManager {
    /// Fails with a configuration error if the config is invalid or the
    /// backup directory cannot be created.
    pub fn new(
        config: &BackupConfig,
        resolver: Arc<dyn ContentRootResolver>,
    ) -> Result<Self, BackupError> {
        config.validate()?;
        let store = BackupStore::open(&config.backup_dir)?;
        Ok(Self {
            store,
            worlds_dir: config.worlds_dir.clone(),
            resolver,
            writer: ArchiveWriter::new(config.compression_level),
            restorer: Restorer::new(config.marker_files.clone())?,
        })
    }

    pub fn store(&self) -> &BackupStore {
        &self.store
    }

    pub fn worlds_dir(&self) -> &Path {
        &self.worlds_dir
    }

    /// Archives the world `name` to `{backup}/worlds/{name}.zip`, replacing
    /// any earlier snapshot of the same name.
    pub fn snapshot(&self, name: &str) -> Result<ArchiveLocation, BackupError> {
        validate_name(name)?;
        let Some(root) = self.resolver.resolve(name) else {
            return Err(BackupError::WorldNotFound(name.to_string()));
        };
        if !root.exists() {
            return Err(BackupError::SourceNotFound(root));
        }
        self.ensure_outside_store(&root)?;

        let _lock = self.store.lock(WORLDS_CATEGORY, name)?;
        self.store.ensure_category(WORLDS_CATEGORY)?;
        let destination = self.store.resolve(WORLDS_CATEGORY, name);

        let enumerator = PathEnumerator::new(&root)?;
        let summary = self.writer.write(&root, enumerator.iter(), &destination)?;

        info!(
            "snapshot of world '{}' written to {} ({} files, {} bytes)",
            name,
            destination.display(),
            summary.entries,
            summary.bytes
        );
        Ok(ArchiveLocation {
            path: destination,
            entries: summary.entries,
            bytes: summary.bytes,
        })
    }

    /// Restores the snapshot `backup` into `{worlds}/{world}`.
    ///
    /// An existing world is only replaced when `overwrite` is set and it
    /// carries the configured marker files.
    pub fn restore(
        &self,
        backup: &str,
        world: &str,
        overwrite: bool,
    ) -> Result<RestoreSummary, BackupError> {
        validate_name(backup)?;
        validate_name(world)?;

        let _lock = self.store.lock(WORLDS_CATEGORY, world)?;
        let archive = self.store.resolve(WORLDS_CATEGORY, backup);
        let destination = self.worlds_dir.join(world);
        let live_root = self.resolver.resolve(world);

        let summary =
            self.restorer
                .restore(&archive, &destination, live_root.as_deref(), overwrite)?;

        info!(
            "restored backup '{}' into {} ({} files, {} bytes)",
            backup,
            destination.display(),
            summary.entries,
            summary.bytes
        );
        Ok(summary)
    }

    pub fn list(&self) -> Result<Vec<StoredArchive>, BackupError> {
        self.store.list(WORLDS_CATEGORY)
    }

    /// A world must not overlap the backup store in either direction.
    fn ensure_outside_store(&self, root: &Path) -> Result<(), BackupError> {
        let store = self.store.root();
        let canonical_root = root
            .canonicalize()
            .map_err(|err| BackupError::io("resolve", root, err))?;
        let canonical_store = store
            .canonicalize()
            .map_err(|err| BackupError::io("resolve", store, err))?;

        if canonical_store.starts_with(&canonical_root)
            || canonical_root.starts_with(&canonical_store)
        {
            return Err(BackupError::OverlapsBackupStore {
                root: root.to_path_buf(),
                store: store.to_path_buf(),
            });
        }
        Ok(())
    }

    pub async fn snapshot_async(
        self: &Arc<Self>,
        name: &str,
    ) -> Result<ArchiveLocation, BackupError> {
        let manager = Arc::clone(self);
        let name = name.to_string();
        tokio::task::spawn_blocking(move || manager.snapshot(&name))
            .await
            .map_err(|err| BackupError::Task(err.to_string()))?
    }

    pub async fn restore_async(
        self: &Arc<Self>,
        backup: &str,
        world: &str,
        overwrite: bool,
    ) -> Result<RestoreSummary, BackupError> {
        let manager = Arc::clone(self);
        let backup = backup.to_string();
        let world = world.to_string();
        tokio::task::spawn_blocking(move || manager.restore(&backup, &world, overwrite))
            .await
            .map_err(|err| BackupError::Task(err.to_string()))?
    }
}
