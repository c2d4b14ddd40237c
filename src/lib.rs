//! repoman - update repository publisher
//!
//! builds and maintains a directory tree that update clients consume over HTTP.
//!
//! # Repository layout
//!
//! - `index.json`: channels and the list of published versions
//! - `{id}.json`: one immutable manifest per version, listing install paths,
//!   content hashes and download URLs
//! - a separate, flat storage directory holding every distinct file once
//!
//! # Publishing
//!
//! a publish hashes the new version's tree and the storage directory, reuses
//! blobs whose content is already stored and copies the rest under names of
//! the form `{hash prefix}-{file name}`. the manifest is written before the
//! index, so the index never references a missing manifest.
//!
//! repository-mutating operations take an advisory lock on the repository
//! root for their whole load/modify/save span.
//!
//! # Example usage
//!
//! ```no_run
//! use repoman::{ops, Repo};
//! use std::path::Path;
//!
//! let repo = Repo::init(Path::new("/srv/updates/repo")).unwrap();
//!
//! let report = ops::publish(
//!     &repo,
//!     &ops::PublishOptions {
//!         storage: Path::new("/srv/updates/files"),
//!         url_base: "https://updates.example.com/files/",
//!         source: Path::new("/build/out"),
//!         version_name: "1.0.0",
//!         version_id: 1,
//!     },
//! )
//! .unwrap();
//!
//! ops::set_channel(&repo, "stable", Some(report.version.id)).unwrap();
//! ```

mod config;
mod error;
mod fs;
mod hash;
mod repo;

pub mod index;
pub mod manifest;
pub mod ops;
pub mod store;
pub mod types;

pub use config::{Config, CONFIG_FILE_NAME, DEFAULT_PREFIX_LEN};
pub use error::{Error, IoResultExt, Result};
pub use hash::{hash_bytes, hash_file, FileHash, Hash, Sha256TreeHasher, TreeHasher};
pub use repo::{update_index, Repo, RepoLock, LOCK_FILE_NAME};
pub use types::{
    Channel, ChannelChange, FileInfo, FileSource, Index, SourceType, Version, VersionSummary,
};
