use std::io::ErrorKind;
use std::path::PathBuf;

/// error type for repoman operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("repository not found at {0}")]
    RepositoryNotFound(PathBuf),

    #[error("repository already exists at {0}")]
    RepositoryExists(PathBuf),

    #[error("cannot create repository at {0}: parent directory does not exist")]
    ParentMissing(PathBuf),

    #[error("invalid repository: index file is missing at {0}")]
    IndexMissing(PathBuf),

    #[error("malformed repository index {path}: {source}")]
    RepositoryMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid file storage directory: {0}")]
    StorageDirectoryInvalid(PathBuf),

    #[error("invalid new version directory: {0}")]
    SourceDirectoryInvalid(PathBuf),

    #[error("version {0} already exists")]
    VersionAlreadyExists(i64),

    #[error("channel already exists: {0}")]
    ChannelAlreadyExists(String),

    #[error("couldn't read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("couldn't write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("permission denied at {path}: {source}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("json serialization error: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("invalid exclude pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("invalid hash hex: {0}")]
    InvalidHashHex(String),

    #[error("{0}")]
    BadArgument(String),

    #[error("lock contention on repository")]
    LockContention,
}

impl Error {
    /// process exit code for this error class
    ///
    /// values are only meant to be distinct per class, not stable across releases.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::BadArgument(_) | Error::NonUtf8Path(_) => 2,
            Error::RepositoryNotFound(_) => 10,
            Error::StorageDirectoryInvalid(_) => 11,
            Error::SourceDirectoryInvalid(_) => 12,
            Error::IndexMissing(_) => 13,
            Error::RepositoryMalformed { .. } => 14,
            Error::RepositoryExists(_) => 15,
            Error::ParentMissing(_) => 16,
            Error::PermissionDenied { .. } => 20,
            Error::Config(_) | Error::InvalidPattern { .. } => 30,
            Error::ChannelAlreadyExists(_) | Error::VersionAlreadyExists(_) => 44,
            Error::FileWrite { .. } => 42,
            Error::FileRead { .. } => 43,
            Error::LockContention => 46,
            Error::Io { .. } | Error::Serialize(_) | Error::InvalidHashHex(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    /// unclassified io failure
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;

    /// failure while reading `path`
    fn for_read(self, path: impl Into<PathBuf>) -> Result<T>;

    /// failure while creating or writing `path`
    fn for_write(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| classify(path.into(), source, |path, source| Error::Io { path, source }))
    }

    fn for_read(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| {
            classify(path.into(), source, |path, source| Error::FileRead { path, source })
        })
    }

    fn for_write(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| {
            classify(path.into(), source, |path, source| Error::FileWrite { path, source })
        })
    }
}

fn classify(
    path: PathBuf,
    source: std::io::Error,
    otherwise: impl FnOnce(PathBuf, std::io::Error) -> Error,
) -> Error {
    if source.kind() == ErrorKind::PermissionDenied {
        Error::PermissionDenied { path, source }
    } else {
        otherwise(path, source)
    }
}
