use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::BackupError;

pub(crate) const CHUNK_SIZE: usize = 64 * 1024;
const PARTIAL_SUFFIX: &str = ".partial";
const ZIP64_THRESHOLD: u64 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArchiveSummary {
    pub entries: usize,
    /// Uncompressed bytes written across all entries.
    pub bytes: u64,
}

/// Streams a content root into a single deflate-compressed zip archive.
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    compression_level: i64,
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new(6)
    }
}

impl ArchiveWriter {
    pub fn new(compression_level: i64) -> Self {
        Self { compression_level }
    }

    /// Writes `entries` (as produced by [`crate::PathEnumerator`]) from `root`
    /// into `destination`.
    ///
    /// The archive is assembled next to the destination and renamed into place
    /// once finalized. On failure the partial file is removed and whatever was
    /// previously at `destination` is left as it was.
    pub fn write<I>(
        &self,
        root: &Path,
        entries: I,
        destination: &Path,
    ) -> Result<ArchiveSummary, BackupError>
    where
        I: IntoIterator<Item = Result<String, BackupError>>,
    {
        if !root.exists() {
            return Err(BackupError::SourceNotFound(root.to_path_buf()));
        }
        let root_name = root
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| BackupError::NotADirectory(root.to_path_buf()))?;

        let parent = destination
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(parent).map_err(|source| BackupError::DestinationUnwritable {
            path: parent.to_path_buf(),
            source,
        })?;
        if !parent.is_dir() {
            return Err(BackupError::DestinationUnwritable {
                path: parent.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
            });
        }

        let partial = partial_path(destination);
        let file = File::create(&partial).map_err(|source| BackupError::DestinationUnwritable {
            path: partial.clone(),
            source,
        })?;

        match self.write_entries(file, root, root_name, entries, &partial) {
            Ok(summary) => {
                fs::rename(&partial, destination).map_err(|err| {
                    let _ = fs::remove_file(&partial);
                    BackupError::io("move archive into place at", destination, err)
                })?;
                Ok(summary)
            }
            Err(err) => {
                warn!(
                    "discarding incomplete archive {}: {}",
                    partial.display(),
                    err
                );
                let _ = fs::remove_file(&partial);
                Err(err)
            }
        }
    }

    fn write_entries<I>(
        &self,
        file: File,
        root: &Path,
        root_name: &str,
        entries: I,
        archive_path: &Path,
    ) -> Result<ArchiveSummary, BackupError>
    where
        I: IntoIterator<Item = Result<String, BackupError>>,
    {
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level));

        let mut summary = ArchiveSummary::default();
        let mut buffer = vec![0u8; CHUNK_SIZE];

        for relative in entries {
            let relative = relative?;
            let entry_name = strip_root_segment(&relative, root_name).ok_or_else(|| {
                BackupError::io(
                    "archive",
                    &root.join(&relative),
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("'{relative}' is not inside '{root_name}'"),
                    ),
                )
            })?;

            let source_path = root.join(entry_name);
            let mut source = File::open(&source_path)
                .map_err(|err| BackupError::io("open", &source_path, err))?;
            let len = source
                .metadata()
                .map_err(|err| BackupError::io("stat", &source_path, err))?
                .len();

            zip.start_file(entry_name, options.large_file(len >= ZIP64_THRESHOLD))
                .map_err(|err| {
                    BackupError::io("start entry in", archive_path, io::Error::other(err))
                })?;

            loop {
                let read = source
                    .read(&mut buffer)
                    .map_err(|err| BackupError::io("read", &source_path, err))?;
                if read == 0 {
                    break;
                }
                zip.write_all(&buffer[..read])
                    .map_err(|err| BackupError::io("write", archive_path, err))?;
                summary.bytes += read as u64;
            }

            debug!("archived {} ({} bytes)", entry_name, len);
            summary.entries += 1;
        }

        let writer = zip
            .finish()
            .map_err(|err| BackupError::io("finalize", archive_path, io::Error::other(err)))?;
        let file = writer
            .into_inner()
            .map_err(|err| BackupError::io("flush", archive_path, err.into_error()))?;
        file.sync_all()
            .map_err(|err| BackupError::io("sync", archive_path, err))?;

        Ok(summary)
    }
}

/// Turns `World/region/r.0.0.mca` into `region/r.0.0.mca` so extracting an
/// archive never reproduces the root folder itself.
pub(crate) fn strip_root_segment<'a>(relative: &'a str, root_name: &str) -> Option<&'a str> {
    let rest = relative.strip_prefix(root_name)?.strip_prefix('/')?;
    let valid = !rest.is_empty()
        && rest
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    valid.then_some(rest)
}

pub(crate) fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}
