use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use uuid::Uuid;

use crate::config::ARCHIVE_SUFFIX;

use super::error::StoreError;

/// Unique, collision-free name of one persisted archive.
///
/// Generated randomly, never derived from user input, so concurrent
/// requests can never overwrite each other's archives. Created once per
/// successful batch and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ArchiveHandle(Uuid);

impl ArchiveHandle {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ArchiveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ArchiveHandle {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

/// A flat directory of completed archives, keyed by their generated
/// handles. Append-only: archives are written once by the packager and
/// read back by downloads; retention is someone else's problem.
#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
}

impl OutputStore {
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, handle: &ArchiveHandle) -> PathBuf {
        self.dir.join(format!("{handle}{ARCHIVE_SUFFIX}"))
    }

    /// Look up an archive by its raw handle string.
    ///
    /// The handle must parse as a UUID before any filesystem access, so a
    /// crafted handle can never reach outside the store directory.
    pub fn fetch(&self, raw_handle: &str) -> Result<Vec<u8>, StoreError> {
        let handle: ArchiveHandle = raw_handle.parse().map_err(|_| StoreError::NotFound)?;
        let path = self.path_for(&handle);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
