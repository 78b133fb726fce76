use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("illegal backup destination {}: {reason}", .path.display())]
    IllegalBackupDestination { path: PathBuf, reason: String },

    #[error("invalid backup config: {0}")]
    InvalidConfig(String),

    #[error("invalid name '{0}': expected a single path segment")]
    InvalidName(String),

    #[error("world '{0}' does not exist")]
    WorldNotFound(String),

    #[error("backup source {} does not exist", .0.display())]
    SourceNotFound(PathBuf),

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error(
        "world at {} overlaps the backup store at {}",
        .root.display(),
        .store.display()
    )]
    OverlapsBackupStore { root: PathBuf, store: PathBuf },

    #[error("backup archive {} does not exist", .0.display())]
    ArchiveNotFound(PathBuf),

    #[error("backup archive {} is corrupt: {reason}", .path.display())]
    CorruptArchive { path: PathBuf, reason: String },

    #[error("restore target {} already exists; enable overwrite to replace it", .0.display())]
    DestinationExists(PathBuf),

    #[error(
        "refusing to overwrite {}: missing marker files [{}]",
        .path.display(),
        .missing.join(", ")
    )]
    UnsafeOverwrite { path: PathBuf, missing: Vec<String> },

    #[error("backup destination {} is not writable: {source}", .path.display())]
    DestinationUnwritable { path: PathBuf, source: io::Error },

    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error("backup task failed: {0}")]
    Task(String),
}

/// Coarse grouping used by callers to decide how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad backup root or settings. Fatal at startup.
    Configuration,
    NotFound,
    /// Refused before any filesystem mutation.
    Conflict,
    Io,
}

impl BackupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackupError::IllegalBackupDestination { .. } | BackupError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            BackupError::InvalidName(_)
            | BackupError::WorldNotFound(_)
            | BackupError::SourceNotFound(_)
            | BackupError::NotADirectory(_)
            | BackupError::ArchiveNotFound(_) => ErrorKind::NotFound,
            BackupError::DestinationExists(_)
            | BackupError::UnsafeOverwrite { .. }
            | BackupError::OverlapsBackupStore { .. } => ErrorKind::Conflict,
            BackupError::CorruptArchive { .. }
            | BackupError::DestinationUnwritable { .. }
            | BackupError::Io { .. }
            | BackupError::Task(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        BackupError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        BackupError::CorruptArchive {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BackupError, ErrorKind};
    use std::path::PathBuf;

    #[test]
    fn groups_variants_into_kinds() {
        let conflict = BackupError::UnsafeOverwrite {
            path: PathBuf::from("worlds/World"),
            missing: vec!["level.dat".to_string()],
        };
        assert_eq!(conflict.kind(), ErrorKind::Conflict);
        assert_eq!(
            BackupError::WorldNotFound("World".to_string()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            BackupError::InvalidConfig("empty".to_string()).kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn messages_name_the_offending_path() {
        let err = BackupError::UnsafeOverwrite {
            path: PathBuf::from("worlds/World"),
            missing: vec!["level.dat".to_string(), "level_sponge.dat".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("worlds/World"));
        assert!(message.contains("level.dat, level_sponge.dat"));
    }
}
