//! version manifests: building them from a storage plan and writing them once

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};
use crate::fs::{create_new, fill_or_remove};
use crate::store::BlobMapping;
use crate::types::{FileInfo, FileSource, Version};

/// make sure a base url ends with a separator
pub fn normalize_url_base(url_base: &str) -> String {
    if url_base.ends_with('/') {
        url_base.to_string()
    } else {
        format!("{}/", url_base)
    }
}

/// build the manifest for a version from its resolved blob mappings
///
/// files keep the order of `mappings`; each gets one http source pointing at
/// its blob under `url_base`.
pub fn build_version(id: i64, name: &str, mappings: &[BlobMapping], url_base: &str) -> Version {
    let url_base = normalize_url_base(url_base);

    let mut version = Version::new(id, name);
    version.files = mappings
        .iter()
        .map(|m| FileInfo {
            install_path: m.install_path.clone(),
            content_hash: m.hash,
            sources: vec![FileSource::http(format!("{}{}", url_base, m.storage_name))],
        })
        .collect();
    version
}

/// path to the manifest of version `id` in the repository at `root`
pub fn version_path(root: &Path, id: i64) -> PathBuf {
    root.join(format!("{}.json", id))
}

/// write a version manifest; fails if one already exists for its id
///
/// a manifest that can't be written completely is removed again.
pub fn write_version(root: &Path, version: &Version) -> Result<PathBuf> {
    let path = version_path(root, version.id);
    let json = serde_json::to_vec_pretty(version).map_err(Error::Serialize)?;

    let file = match create_new(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(Error::VersionAlreadyExists(version.id))
        }
        Err(e) => return Err(e).for_write(&path),
    };
    fill_or_remove(&path, file, |file| {
        file.write_all(&json).for_write(&path)?;
        file.sync_all().for_write(&path)
    })?;

    Ok(path)
}

/// read the manifest of version `id`
pub fn read_version(root: &Path, id: i64) -> Result<Version> {
    let path = version_path(root, id);
    let content = fs::read(&path).for_read(&path)?;
    serde_json::from_slice(&content).map_err(|source| Error::RepositoryMalformed { path, source })
}
