use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::{IoResultExt, Result};
use crate::Error;

/// SHA-256 hash used for content addressing
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 32]);

impl Hash {
    /// length of the hex form
    pub const HEX_LEN: usize = 64;

    /// parse from hex string
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        let bytes = hex::decode(s).map_err(|_| Error::InvalidHashHex(s.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::InvalidHashHex(s.to_string()))?;
        Ok(Self(arr))
    }

    /// convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..12])
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// compute the content hash of a byte slice
pub fn hash_bytes(content: &[u8]) -> Hash {
    Hash(Sha256::digest(content).into())
}

/// compute the content hash of a file, streaming its bytes
pub fn hash_file(path: &Path) -> Result<Hash> {
    let mut file = File::open(path).for_read(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024]; // 64KB buffer
    loop {
        let n = file.read(&mut buf).for_read(path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Hash(hasher.finalize().into()))
}

/// a file found under a hashed directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileHash {
    /// path relative to the hashed directory, `/`-separated
    pub path: String,
    pub hash: Hash,
}

impl FileHash {
    pub fn new(path: impl Into<String>, hash: Hash) -> Self {
        Self {
            path: path.into(),
            hash,
        }
    }
}

/// computes a content hash for every file under a directory
pub trait TreeHasher {
    /// hash every regular file under `root`, recursively, skipping excluded paths.
    /// results are ordered by path.
    fn hash_tree(&self, root: &Path) -> Result<Vec<FileHash>>;
}

/// SHA-256 tree hasher with glob based exclusion
#[derive(Clone, Debug, Default)]
pub struct Sha256TreeHasher {
    exclude: Vec<Pattern>,
}

impl Sha256TreeHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// build a hasher skipping paths that match any of `patterns`
    pub fn with_excludes<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let exclude = patterns
            .iter()
            .map(|p| {
                Pattern::new(p.as_ref()).map_err(|source| Error::InvalidPattern {
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { exclude })
    }

    fn is_excluded(&self, rel: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(rel))
    }
}

impl TreeHasher for Sha256TreeHasher {
    fn hash_tree(&self, root: &Path) -> Result<Vec<FileHash>> {
        let mut files = Vec::new();

        let mut it = WalkDir::new(root).sort_by_file_name().into_iter();
        while let Some(entry) = it.next() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                Error::FileRead { path, source }
            })?;

            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };
            if rel.as_os_str().is_empty() {
                continue;
            }
            // relative paths end up in manifests and blob names verbatim
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_str())
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| Error::NonUtf8Path(entry.path().to_path_buf()))?
                .join("/");

            if self.is_excluded(&rel) {
                if entry.file_type().is_dir() {
                    it.skip_current_dir();
                }
                tracing::trace!(path = %rel, "excluded from hashing");
                continue;
            }

            if entry.file_type().is_file() {
                let hash = hash_file(entry.path())?;
                files.push(FileHash::new(rel, hash));
            }
        }

        Ok(files)
    }
}
