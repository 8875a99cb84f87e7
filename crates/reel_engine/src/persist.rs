//! On-disk storage for finished videos.
//!
//! A target file holds either the previous video or the complete new one,
//! never a partial write: each artifact is staged next to its target, synced,
//! then renamed into place.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("video output directory unusable: {0}")]
    OutputDir(String),
    #[error("writing video failed: {0}")]
    Io(#[from] io::Error),
}

/// Creates the video output directory if needed. An existing path that is
/// not a directory is an error.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(PersistError::OutputDir(format!(
            "{} is not a directory",
            dir.display()
        ))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => fs::create_dir_all(dir)
            .map_err(|e| PersistError::OutputDir(format!("{}: {}", dir.display(), e))),
        Err(err) => Err(PersistError::OutputDir(format!("{}: {}", dir.display(), err))),
    }
}

/// Writes whole artifacts into one directory, replacing same-named files
/// atomically.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Stores `content` as `{dir}/{filename}` and returns the final path.
    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut staged = NamedTempFile::new_in(&self.dir)?;
        staged.write_all(content)?;
        staged.as_file_mut().sync_all()?;

        staged.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}
