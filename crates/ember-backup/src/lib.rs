//! Snapshot and restore of world directories as zip archives.
//!
//! A [`SnapshotManager`] ties together the pieces: [`PathEnumerator`] walks a
//! world, [`ArchiveWriter`] packs it into `{backup}/worlds/{name}.zip`, and
//! [`Restorer`] unpacks an archive into a world directory, refusing to delete
//! anything that does not look like a world.

pub mod config;
pub mod errors;

mod enumerate;
mod manager;
mod resolver;
mod restore;
mod store;
mod writer;

pub use config::BackupConfig;
pub use enumerate::{EnumeratedFiles, PathEnumerator};
pub use errors::{BackupError, ErrorKind};
pub use manager::{ArchiveLocation, SnapshotManager};
pub use resolver::{ContentRootResolver, WorldsDirectory};
pub use restore::{ArchiveReader, RestoreSummary, Restorer};
pub use store::{
    ARCHIVE_EXTENSION, BackupStore, NameLock, StoredArchive, WORLDS_CATEGORY, validate_name,
};
pub use writer::{ArchiveSummary, ArchiveWriter};
