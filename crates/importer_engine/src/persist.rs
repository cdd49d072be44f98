use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory {0:?} missing or not writable")]
    OutputDir(PathBuf, #[source] io::Error),
    #[error("{0:?} exists and is not a directory")]
    NotADirectory(PathBuf),
    #[error("{0:?} has no file name")]
    NoFileName(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create it and any missing ancestors.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(dir.to_path_buf(), e))?;
        if !meta.is_dir() {
            return Err(PersistError::NotADirectory(dir.to_path_buf()));
        }
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(dir.to_path_buf(), e))
}

/// Writes `content` to `path`, replacing any existing file.
///
/// The bytes land in a temp file next to the target first and are renamed
/// into place, so a failed write leaves no partial document behind.
pub fn write_document(path: &Path, content: &[u8]) -> Result<PathBuf, PersistError> {
    if path.file_name().is_none() {
        return Err(PersistError::NoFileName(path.to_path_buf()));
    }
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    ensure_output_dir(dir)?;

    let temp_dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    let mut tmp = NamedTempFile::new_in(temp_dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;

    if path.is_dir() {
        return Err(PersistError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{path:?} is a directory"),
        )));
    }
    tmp.persist(path).map_err(|e| PersistError::Io(e.error))?;
    Ok(path.to_path_buf())
}
