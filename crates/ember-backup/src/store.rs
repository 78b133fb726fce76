use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use fs2::FileExt;

use crate::errors::BackupError;

pub const WORLDS_CATEGORY: &str = "worlds";
pub const ARCHIVE_EXTENSION: &str = "zip";
const LOCKS_DIR: &str = ".locks";

/// An archive found in the store.
#[derive(Debug, Clone)]
pub struct StoredArchive {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// Exclusive advisory lock on one name. Released on drop.
pub struct NameLock {
    _file: File,
}

/// The directory tree all archives live under, split into categories.
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    /// Opens the store, creating its root if needed. A root that cannot be
    /// created or is not a directory is fatal.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, BackupError> {
        let store = Self { root: root.into() };
        store.ensure_root_exists()?;
        Ok(store)
    }

    pub fn ensure_root_exists(&self) -> Result<(), BackupError> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(|err| {
                BackupError::IllegalBackupDestination {
                    path: self.root.clone(),
                    reason: format!("could not be created: {err}"),
                }
            })?;
        }
        if !self.root.is_dir() {
            return Err(BackupError::IllegalBackupDestination {
                path: self.root.clone(),
                reason: "not a directory".to_string(),
            });
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self, category: &str) -> PathBuf {
        self.root.join(category)
    }

    /// `{root}/{category}/{name}.zip`
    pub fn resolve(&self, category: &str, name: &str) -> PathBuf {
        self.category_dir(category)
            .join(format!("{name}.{ARCHIVE_EXTENSION}"))
    }

    pub fn ensure_category(&self, category: &str) -> Result<PathBuf, BackupError> {
        let dir = self.category_dir(category);
        fs::create_dir_all(&dir).map_err(|source| BackupError::DestinationUnwritable {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    /// Archives in `category`, sorted by name. Partial writes are skipped.
    pub fn list(&self, category: &str) -> Result<Vec<StoredArchive>, BackupError> {
        let dir = self.category_dir(category);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut archives = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|err| BackupError::io("list", &dir, err))? {
            let entry = entry.map_err(|err| BackupError::io("list", &dir, err))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ARCHIVE_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let metadata = entry
                .metadata()
                .map_err(|err| BackupError::io("stat", &path, err))?;
            if !metadata.is_file() {
                continue;
            }
            archives.push(StoredArchive {
                name: name.to_string(),
                size: metadata.len(),
                modified: metadata.modified().ok(),
                path,
            });
        }

        archives.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(archives)
    }

    /// Blocks until this process holds the lock for `name` in `category`.
    pub fn lock(&self, category: &str, name: &str) -> Result<NameLock, BackupError> {
        let dir = self.root.join(LOCKS_DIR);
        fs::create_dir_all(&dir).map_err(|source| BackupError::DestinationUnwritable {
            path: dir.clone(),
            source,
        })?;
        let path = dir.join(format!("{category}-{name}.lock"));
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| BackupError::io("open lock", &path, err))?;
        file.lock_exclusive()
            .map_err(|err| BackupError::io("lock", &path, err))?;
        Ok(NameLock { _file: file })
    }
}

/// World and archive names must be one plain path segment.
pub fn validate_name(name: &str) -> Result<(), BackupError> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(BackupError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{BackupStore, WORLDS_CATEGORY, validate_name};
    use crate::errors::{BackupError, ErrorKind};
    use crate::writer::partial_path;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("ember-store-{prefix}-{nanos}"))
    }

    #[test]
    fn creates_missing_root_and_resolves_archive_paths() {
        let dir = unique_temp_dir("create");
        let store = BackupStore::open(dir.join("backup")).expect("open store");
        assert!(store.root().is_dir());
        assert_eq!(
            store.resolve(WORLDS_CATEGORY, "World"),
            dir.join("backup").join("worlds").join("World.zip")
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn file_root_is_an_illegal_destination() {
        let dir = unique_temp_dir("file");
        std::fs::create_dir_all(&dir).expect("create dir");
        std::fs::write(dir.join("backup"), b"not a dir").expect("write file");

        let err = BackupStore::open(dir.join("backup")).expect_err("file root");
        assert!(matches!(err, BackupError::IllegalBackupDestination { .. }));
        assert_eq!(err.kind(), ErrorKind::Configuration);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn lists_archives_sorted_and_skips_partials() {
        let dir = unique_temp_dir("list");
        let store = BackupStore::open(&dir).expect("open store");
        let worlds = store.ensure_category(WORLDS_CATEGORY).expect("worlds dir");
        std::fs::write(worlds.join("b.zip"), b"bb").expect("write b");
        std::fs::write(worlds.join("a.zip"), b"a").expect("write a");
        std::fs::write(partial_path(&store.resolve(WORLDS_CATEGORY, "c")), b"c")
            .expect("write partial");
        std::fs::write(worlds.join("notes.txt"), b"n").expect("write notes");

        let listed = store.list(WORLDS_CATEGORY).expect("list archives");
        let names: Vec<&str> = listed.iter().map(|archive| archive.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(listed[1].size, 2);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = unique_temp_dir("lock");
        let store = BackupStore::open(&dir).expect("open store");
        let first = store.lock(WORLDS_CATEGORY, "World").expect("first lock");
        drop(first);
        let _second = store.lock(WORLDS_CATEGORY, "World").expect("second lock");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn same_name_lock_waits_for_the_holder() {
        let dir = unique_temp_dir("contend");
        let store = BackupStore::open(&dir).expect("open store");
        let held = store.lock(WORLDS_CATEGORY, "World").expect("first lock");

        let (tx, rx) = std::sync::mpsc::channel();
        let contender = store.clone();
        let waiter = std::thread::spawn(move || {
            let lock = contender.lock(WORLDS_CATEGORY, "World");
            let _ = tx.send(lock.is_ok());
            drop(lock);
        });

        assert!(
            rx.recv_timeout(Duration::from_millis(300)).is_err(),
            "second lock acquired while the first was held"
        );
        let _other = store
            .lock(WORLDS_CATEGORY, "Lobby")
            .expect("different names do not contend");

        drop(held);
        let acquired = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("waiter gets the lock once released");
        assert!(acquired);
        waiter.join().expect("join waiter");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn names_must_be_single_segments() {
        validate_name("World").expect("plain name");
        validate_name("my.world").expect("dotted name");
        for bad in ["", " ", ".", "..", "a/b", "a\\b", "../World"] {
            assert!(validate_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
