use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IoResultExt, Result};
use crate::hash::Sha256TreeHasher;

/// file name of the optional repository configuration
pub const CONFIG_FILE_NAME: &str = "repoman.toml";

/// shortest hash prefix used when naming new blobs
pub const DEFAULT_PREFIX_LEN: usize = 4;

/// repository configuration stored in repoman.toml
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// glob patterns (relative paths) skipped when hashing source and storage trees
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// number of hash characters a new storage name starts with
    #[serde(default = "default_prefix_len")]
    pub prefix_len: usize,
}

fn default_prefix_len() -> usize {
    DEFAULT_PREFIX_LEN
}

impl Config {
    /// load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).for_read(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// load config from file, falling back to defaults when it doesn't exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// tree hasher honoring the configured exclusions
    pub fn hasher(&self) -> Result<Sha256TreeHasher> {
        Sha256TreeHasher::with_excludes(&self.exclude)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude: vec![],
            prefix_len: DEFAULT_PREFIX_LEN,
        }
    }
}
