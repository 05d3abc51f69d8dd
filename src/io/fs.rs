//! Filesystem collaborator used to open output files.
//!
//! The sink never touches `std::fs` directly; it goes through a [`FileSystem`]
//! so that virtual filesystems can be plugged in.

use crate::io::compression::RawStream;
use anyhow::{Context, Result};
use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};

/// Operations the sink needs from a filesystem.
pub trait FileSystem: Send + Sync {
    /// Whether `path` currently exists.
    fn exists(&self, path: &str) -> Result<bool>;

    /// Open `path` for writing, appending to or truncating existing content.
    fn open(&self, path: &str, append: bool) -> Result<RawStream>;

    /// Parent folder of `path`, if it has one.
    fn parent_of(&self, path: &str) -> Option<PathBuf> {
        Path::new(path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }

    /// Whether `folder` exists.
    fn folder_exists(&self, folder: &Path) -> Result<bool>;

    /// Create `folder` and any missing ancestors.
    fn create_folder(&self, folder: &Path) -> Result<()>;
}

/// The local disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &str) -> Result<bool> {
        Path::new(path)
            .try_exists()
            .with_context(|| format!("check existence of {path}"))
    }

    fn open(&self, path: &str, append: bool) -> Result<RawStream> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)
            .with_context(|| format!("open {path}"))?;
        Ok(Box::new(file))
    }

    fn folder_exists(&self, folder: &Path) -> Result<bool> {
        Ok(folder.is_dir())
    }

    fn create_folder(&self, folder: &Path) -> Result<()> {
        create_dir_all(folder).with_context(|| format!("mkdir -p {}", folder.display()))
    }
}
