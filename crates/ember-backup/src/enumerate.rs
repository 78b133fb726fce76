use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::errors::BackupError;

/// Lists every regular file under a root directory.
///
/// Yielded paths are relative to the root's parent and use `/` separators, so
/// they start with the root's own folder name (`World/region/r.0.0.mca`).
/// Siblings are visited in file name order. Symbolic links are followed: a
/// link to a file is listed like a regular file, a link to a directory is
/// descended into, and dangling links or loops surface as errors.
/// Entry names must be UTF-8: a file or directory whose name is not yields an
/// `InvalidData` error, which fails the whole snapshot.
#[derive(Debug, Clone)]
pub struct PathEnumerator {
    root: PathBuf,
    root_name: String,
}

impl PathEnumerator {
    pub fn new(root: &Path) -> Result<Self, BackupError> {
        if !root.is_dir() {
            return Err(BackupError::NotADirectory(root.to_path_buf()));
        }
        let root_name = root
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| BackupError::NotADirectory(root.to_path_buf()))?;

        Ok(Self {
            root: root.to_path_buf(),
            root_name,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Starts a fresh walk. Each call restarts from the top.
    pub fn iter(&self) -> EnumeratedFiles<'_> {
        EnumeratedFiles {
            enumerator: self,
            walk: WalkDir::new(&self.root)
                .min_depth(1)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter(),
        }
    }

    fn relative_name(&self, path: &Path) -> Result<String, BackupError> {
        let rel = path.strip_prefix(&self.root).map_err(|_| {
            BackupError::io(
                "enumerate",
                path,
                io::Error::other("path escaped the enumerated root"),
            )
        })?;

        let mut name = self.root_name.clone();
        for component in rel.components() {
            let segment = component.as_os_str().to_str().ok_or_else(|| {
                BackupError::io(
                    "enumerate",
                    path,
                    io::Error::new(io::ErrorKind::InvalidData, "file name is not valid UTF-8"),
                )
            })?;
            name.push('/');
            name.push_str(segment);
        }
        Ok(name)
    }
}

impl<'a> IntoIterator for &'a PathEnumerator {
    type Item = Result<String, BackupError>;
    type IntoIter = EnumeratedFiles<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct EnumeratedFiles<'a> {
    enumerator: &'a PathEnumerator,
    walk: walkdir::IntoIter,
}

impl Iterator for EnumeratedFiles<'_> {
    type Item = Result<String, BackupError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walk.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.enumerator.root.clone());
                    return Some(Err(BackupError::io("walk", &path, io::Error::other(err))));
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            return Some(self.enumerator.relative_name(entry.path()));
        }
    }
}
