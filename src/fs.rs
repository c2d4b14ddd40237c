//! write helpers shared by the index, manifests and blob storage

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use crate::error::{IoResultExt, Result};

/// create `path`, failing if anything already exists there
pub fn create_new(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// run `fill` on a file just created at `path`, removing the file if it fails
///
/// no caller ever leaves a truncated file behind under its final name.
pub fn fill_or_remove<T>(
    path: &Path,
    mut file: File,
    fill: impl FnOnce(&mut File) -> Result<T>,
) -> Result<T> {
    match fill(&mut file) {
        Ok(value) => Ok(value),
        Err(e) => {
            drop(file);
            let _ = fs::remove_file(path);
            Err(e)
        }
    }
}

/// replace `path` atomically: temp -> fill -> fsync -> rename
///
/// the temp file lives next to `path` and is removed on every failure, so a
/// failed replace leaves the previous file and nothing else.
pub fn replace_atomic(path: &Path, fill: impl FnOnce(&mut File) -> Result<()>) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    let tmp_path = dir.join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()));

    let tmp_file = File::create(&tmp_path).for_write(&tmp_path)?;
    fill_or_remove(&tmp_path, tmp_file, |file| {
        fill(file)?;
        file.sync_all().for_write(&tmp_path)
    })?;

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e).for_write(path);
    }
    Ok(())
}
