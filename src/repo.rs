use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};

use crate::config::{Config, CONFIG_FILE_NAME};
use crate::error::{Error, IoResultExt, Result};
use crate::index::{index_path, load_index, save_index};
use crate::types::Index;

/// name of the advisory lock file at the repository root
pub const LOCK_FILE_NAME: &str = ".repoman.lock";

/// an update repository on the local filesystem
pub struct Repo {
    path: PathBuf,
    config: Config,
}

impl Repo {
    /// create a new repository with an empty index
    ///
    /// the directory itself must not exist yet; its parent must.
    pub fn init(path: &Path) -> Result<Self> {
        if let Err(e) = std::fs::create_dir(path) {
            return Err(match e.kind() {
                ErrorKind::AlreadyExists => Error::RepositoryExists(path.to_path_buf()),
                ErrorKind::NotFound => Error::ParentMissing(path.to_path_buf()),
                _ => return Err(e).with_path(path),
            });
        }

        save_index(path, &Index::new())?;
        tracing::info!(path = %path.display(), "initialized repository");

        Ok(Self {
            path: path.to_path_buf(),
            config: Config::default(),
        })
    }

    /// open an existing repository
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(Error::RepositoryNotFound(path.to_path_buf()));
        }

        let config = Config::load_or_default(&path.join(CONFIG_FILE_NAME))?;

        Ok(Self {
            path: path.to_path_buf(),
            config,
        })
    }

    /// repository root path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// repository configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// path to index.json
    pub fn index_path(&self) -> PathBuf {
        index_path(&self.path)
    }

    /// load the repository index
    pub fn load_index(&self) -> Result<Index> {
        load_index(&self.path)
    }

    /// persist the repository index
    pub fn save_index(&self, index: &Index) -> Result<()> {
        save_index(&self.path, index)
    }

    /// path to lock file
    pub fn lock_path(&self) -> PathBuf {
        self.path.join(LOCK_FILE_NAME)
    }

    /// acquire exclusive lock on repository
    /// returns a guard that releases the lock on drop
    pub fn lock(&self) -> Result<RepoLock> {
        let lock_path = self.lock_path();
        let file = File::create(&lock_path).with_path(&lock_path)?;

        let flock = Flock::lock(file, FlockArg::LockExclusiveNonblock)
            .map_err(|_| Error::LockContention)?;

        Ok(RepoLock { flock })
    }
}

/// guard that holds repository lock until dropped
pub struct RepoLock {
    #[allow(dead_code)]
    flock: Flock<File>,
}
// lock is released automatically when Flock is dropped

/// load the index, apply `f` and save the result while holding the repository lock
///
/// nothing is saved if `f` fails.
pub fn update_index<T, F>(repo: &Repo, f: F) -> Result<T>
where
    F: FnOnce(&mut Index) -> Result<T>,
{
    let _lock = repo.lock()?;
    let mut index = repo.load_index()?;
    let out = f(&mut index)?;
    repo.save_index(&index)?;
    Ok(out)
}
