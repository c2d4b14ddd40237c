//! loading and persisting the repository index

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};
use crate::fs::replace_atomic;
use crate::types::Index;

/// file name of the index at the repository root
pub const INDEX_FILE_NAME: &str = "index.json";

/// path to the index file of the repository at `root`
pub fn index_path(root: &Path) -> PathBuf {
    root.join(INDEX_FILE_NAME)
}

/// load the index of the repository at `root`
pub fn load_index(root: &Path) -> Result<Index> {
    if !root.is_dir() {
        return Err(Error::RepositoryNotFound(root.to_path_buf()));
    }

    let path = index_path(root);
    let content = match fs::read(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::IndexMissing(path)),
        Err(e) => return Err(e).for_read(&path),
    };

    serde_json::from_slice(&content).map_err(|source| Error::RepositoryMalformed { path, source })
}

/// replace the index of the repository at `root`
///
/// atomic write: temp -> fsync -> rename, so a failed save leaves the previous
/// index intact. the index is written compact, in the field order it was read.
pub fn save_index(root: &Path, index: &Index) -> Result<()> {
    let json = serde_json::to_vec(index).map_err(Error::Serialize)?;

    let path = index_path(root);
    replace_atomic(&path, |file| file.write_all(&json).for_write(&path))?;

    tracing::debug!(
        path = %path.display(),
        channels = index.channels.len(),
        versions = index.versions.len(),
        "saved index"
    );
    Ok(())
}
