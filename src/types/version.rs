use serde::{Deserialize, Serialize};

use crate::hash::Hash;

/// a version manifest, stored as {id}.json
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub files: Vec<FileInfo>,
}

impl Version {
    /// create an empty manifest
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            files: vec![],
        }
    }
}

/// a file installed by a version
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub install_path: String,
    pub content_hash: Hash,
    pub sources: Vec<FileSource>,
}

/// where an update client can retrieve a file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSource {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub url: String,
}

impl FileSource {
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            source_type: SourceType::Http,
            url: url.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Http,
}
