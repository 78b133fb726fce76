use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::errors::BackupError;
use crate::writer::CHUNK_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestoreSummary {
    pub entries: usize,
    pub bytes: u64,
}

/// An opened archive whose entry names have all been checked to stay inside
/// any extraction target.
pub struct ArchiveReader {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
}

impl ArchiveReader {
    pub fn open(path: &Path) -> Result<Self, BackupError> {
        if !path.is_file() {
            return Err(BackupError::ArchiveNotFound(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|err| BackupError::io("open", path, err))?;
        let mut archive = ZipArchive::new(BufReader::new(file))
            .map_err(|err| BackupError::corrupt(path, err.to_string()))?;

        for index in 0..archive.len() {
            let entry = archive
                .by_index_raw(index)
                .map_err(|err| BackupError::corrupt(path, format!("entry #{index}: {err}")))?;
            if entry.enclosed_name().is_none() {
                return Err(BackupError::corrupt(
                    path,
                    format!("entry '{}' escapes the restore target", entry.name()),
                ));
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    pub fn entry_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Streams every entry into `destination`, creating parent directories as
    /// needed. Files already written stay in place if a later entry fails.
    pub fn extract_to(&mut self, destination: &Path) -> Result<RestoreSummary, BackupError> {
        let mut summary = RestoreSummary::default();
        let mut buffer = vec![0u8; CHUNK_SIZE];

        for index in 0..self.archive.len() {
            let mut entry = self
                .archive
                .by_index(index)
                .map_err(|err| BackupError::corrupt(&self.path, format!("entry #{index}: {err}")))?;
            let Some(relative) = entry.enclosed_name() else {
                return Err(BackupError::corrupt(
                    &self.path,
                    format!("entry '{}' escapes the restore target", entry.name()),
                ));
            };
            let target = destination.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&target)
                    .map_err(|err| BackupError::io("create directory", &target, err))?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|err| BackupError::io("create directory", parent, err))?;
            }
            let file =
                File::create(&target).map_err(|err| BackupError::io("create", &target, err))?;
            let mut out = BufWriter::new(file);

            loop {
                // Decoder failures mean the stored entry data is damaged.
                let read = entry.read(&mut buffer).map_err(|err| match err.kind() {
                    io::ErrorKind::InvalidData
                    | io::ErrorKind::InvalidInput
                    | io::ErrorKind::UnexpectedEof => {
                        BackupError::corrupt(&self.path, format!("entry '{}': {err}", entry.name()))
                    }
                    _ => BackupError::io("read", &self.path, err),
                })?;
                if read == 0 {
                    break;
                }
                out.write_all(&buffer[..read])
                    .map_err(|err| BackupError::io("write", &target, err))?;
                summary.bytes += read as u64;
            }
            out.flush()
                .map_err(|err| BackupError::io("write", &target, err))?;

            debug!("restored {}", target.display());
            summary.entries += 1;
        }

        Ok(summary)
    }
}

/// Applies the overwrite policy and extracts archives into restore targets.
#[derive(Debug, Clone)]
pub struct Restorer {
    markers: Vec<String>,
}

impl Restorer {
    /// Blank names are dropped. Fails when no marker is left.
    pub fn new(markers: Vec<String>) -> Result<Self, BackupError> {
        let markers: Vec<String> = markers
            .into_iter()
            .map(|marker| marker.trim().to_string())
            .filter(|marker| !marker.is_empty())
            .collect();
        if markers.is_empty() {
            return Err(BackupError::InvalidConfig(
                "marker_files must name at least one file".to_string(),
            ));
        }
        Ok(Self { markers })
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Restores `archive` into `destination`.
    ///
    /// `live_root` is where the host reports a live content root of the same
    /// name, if any. An existing target (live or merely on disk) is only
    /// removed when `overwrite` is set and it holds every marker file; the
    /// archive is fully validated before anything is removed.
    pub fn restore(
        &self,
        archive: &Path,
        destination: &Path,
        live_root: Option<&Path>,
        overwrite: bool,
    ) -> Result<RestoreSummary, BackupError> {
        let mut reader = ArchiveReader::open(archive)?;

        let mut existing: Vec<PathBuf> = Vec::new();
        if let Some(live) = live_root {
            existing.push(live.to_path_buf());
        }
        if fs::symlink_metadata(destination).is_ok()
            && !existing.iter().any(|path| same_location(path, destination))
        {
            existing.push(destination.to_path_buf());
        }

        if let Some(first) = existing.first() {
            if !overwrite {
                return Err(BackupError::DestinationExists(first.clone()));
            }
            for path in &existing {
                let missing = missing_markers(path, &self.markers)?;
                if !missing.is_empty() {
                    warn!(
                        "refusing to overwrite {}: missing {}",
                        path.display(),
                        missing.join(", ")
                    );
                    return Err(BackupError::UnsafeOverwrite {
                        path: path.clone(),
                        missing,
                    });
                }
            }
            for path in existing.iter().filter(|path| fs::symlink_metadata(path).is_ok()) {
                info!("removing existing world at {}", path.display());
                fs::remove_dir_all(path).map_err(|err| BackupError::io("remove", path, err))?;
            }
        }

        fs::create_dir_all(destination)
            .map_err(|err| BackupError::io("create directory", destination, err))?;
        reader.extract_to(destination)
    }
}

/// Marker names not present as files directly inside `dir`. Anything that is
/// not a directory is missing all of them.
pub(crate) fn missing_markers(dir: &Path, markers: &[String]) -> Result<Vec<String>, BackupError> {
    let metadata = match fs::symlink_metadata(dir) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(BackupError::io("inspect", dir, err)),
    };
    if !metadata.is_dir() {
        return Ok(markers.to_vec());
    }

    let mut present = HashSet::new();
    for entry in fs::read_dir(dir).map_err(|err| BackupError::io("list", dir, err))? {
        let entry = entry.map_err(|err| BackupError::io("list", dir, err))?;
        let is_file = entry
            .file_type()
            .map(|file_type| file_type.is_file())
            .unwrap_or(false);
        if is_file {
            present.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }

    Ok(markers
        .iter()
        .filter(|marker| !present.contains(marker.as_str()))
        .cloned()
        .collect())
}

fn same_location(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
