use std::collections::{HashMap, HashSet};

use crate::hash::{FileHash, Hash};
use crate::store::naming::{base_name, storage_name};

/// an incoming file resolved to a blob in the content store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobMapping {
    /// name of the blob in the storage directory
    pub storage_name: String,
    /// where the file is installed, relative to the version root
    pub install_path: String,
    pub hash: Hash,
}

/// result of diffing an incoming tree against the content store
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoragePlan {
    /// one mapping per incoming file, in input order
    pub entries: Vec<BlobMapping>,
    /// blobs that must be copied into storage, in input order
    pub added: Vec<BlobMapping>,
}

impl StoragePlan {
    /// number of incoming files served by a blob that was already stored
    pub fn reused(&self) -> usize {
        self.entries.len() - self.added.len()
    }
}

/// decide which incoming files are already stored and name the rest
///
/// an incoming file maps to the first existing blob with the same hash. files
/// not yet stored get a fresh name; later incoming files with the same hash
/// share it. `name_exists` reports names present in the storage directory but
/// not listed in `existing` (e.g. excluded from hashing).
pub fn plan_storage(
    incoming: &[FileHash],
    existing: &[FileHash],
    prefix_len: usize,
    mut name_exists: impl FnMut(&str) -> bool,
) -> StoragePlan {
    let mut by_hash: HashMap<Hash, String> = HashMap::new();
    let mut reserved: HashSet<String> = HashSet::new();
    for blob in existing {
        by_hash
            .entry(blob.hash)
            .or_insert_with(|| blob.path.clone());
        reserved.insert(blob.path.clone());
    }

    let mut plan = StoragePlan::default();
    for file in incoming {
        if let Some(name) = by_hash.get(&file.hash) {
            tracing::debug!(path = %file.path, blob = %name, "already stored");
            plan.entries.push(BlobMapping {
                storage_name: name.clone(),
                install_path: file.path.clone(),
                hash: file.hash,
            });
            continue;
        }

        let name = storage_name(
            &file.hash.to_hex(),
            base_name(&file.path),
            prefix_len,
            |candidate| reserved.contains(candidate) || name_exists(candidate),
        );
        tracing::debug!(path = %file.path, blob = %name, "new blob");

        reserved.insert(name.clone());
        by_hash.insert(file.hash, name.clone());

        let mapping = BlobMapping {
            storage_name: name,
            install_path: file.path.clone(),
            hash: file.hash,
        };
        plan.added.push(mapping.clone());
        plan.entries.push(mapping);
    }

    plan
}
