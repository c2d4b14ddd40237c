use std::path::Path;

use crate::error::{Error, Result};
use crate::hash::TreeHasher;
use crate::manifest::{build_version, version_path, write_version};
use crate::repo::Repo;
use crate::store::{materialize, plan_storage};
use crate::types::Version;

/// inputs of a publish
#[derive(Clone, Copy, Debug)]
pub struct PublishOptions<'a> {
    /// flat directory holding the blobs, reachable at `url_base`
    pub storage: &'a Path,
    /// base URL the storage directory is served from
    pub url_base: &'a str,
    /// directory holding the new version's files
    pub source: &'a Path,
    pub version_name: &'a str,
    pub version_id: i64,
}

/// outcome of a successful publish
#[derive(Debug)]
pub struct PublishReport {
    pub version: Version,
    /// files served by blobs that were already stored
    pub reused: usize,
    /// blobs copied into storage
    pub added: usize,
    pub bytes_copied: u64,
}

/// publish a new version using the repository's configured hasher
pub fn publish(repo: &Repo, options: &PublishOptions<'_>) -> Result<PublishReport> {
    let hasher = repo.config().hasher()?;
    publish_with_hasher(repo, options, &hasher)
}

/// publish a new version: store its new blobs, write its manifest and add it
/// to the index
///
/// the index is only written once the blobs and the manifest are on disk. if
/// that final write fails, the manifest is left behind without an index entry.
pub fn publish_with_hasher(
    repo: &Repo,
    options: &PublishOptions<'_>,
    hasher: &dyn TreeHasher,
) -> Result<PublishReport> {
    let PublishOptions {
        storage,
        url_base,
        source,
        version_name,
        version_id,
    } = *options;

    // validate inputs
    if version_id < 0 {
        return Err(Error::BadArgument(format!(
            "version id must be a non-negative integer, got {}",
            version_id
        )));
    }
    if !repo.path().is_dir() {
        return Err(Error::RepositoryNotFound(repo.path().to_path_buf()));
    }
    if !storage.is_dir() {
        return Err(Error::StorageDirectoryInvalid(storage.to_path_buf()));
    }
    if !source.is_dir() {
        return Err(Error::SourceDirectoryInvalid(source.to_path_buf()));
    }

    let _lock = repo.lock()?;
    let mut index = repo.load_index()?;
    if index.version(version_id).is_some() || version_path(repo.path(), version_id).exists() {
        return Err(Error::VersionAlreadyExists(version_id));
    }

    // diff the new tree against storage
    let incoming = hasher.hash_tree(source)?;
    let existing = hasher.hash_tree(storage)?;
    let plan = plan_storage(&incoming, &existing, repo.config().prefix_len, |name| {
        storage.join(name).symlink_metadata().is_ok()
    });

    let bytes_copied = materialize(&plan.added, source, storage)?;

    let version = build_version(version_id, version_name, &plan.entries, url_base);
    let manifest = write_version(repo.path(), &version)?;

    index.append_version(version_id, version_name);
    if let Err(e) = repo.save_index(&index) {
        tracing::warn!(
            manifest = %manifest.display(),
            "index update failed, manifest is not referenced by the index"
        );
        return Err(e);
    }

    tracing::info!(
        version = version_id,
        name = version_name,
        files = plan.entries.len(),
        reused = plan.reused(),
        added = plan.added.len(),
        bytes = bytes_copied,
        "published version"
    );

    Ok(PublishReport {
        reused: plan.reused(),
        added: plan.added.len(),
        bytes_copied,
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{hash_bytes, FileHash, Sha256TreeHasher};
    use crate::manifest::read_version;
    use crate::ops::set_channel;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    struct Fixture {
        _dir: tempfile::TempDir,
        repo: Repo,
        storage: PathBuf,
        root: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let repo = Repo::init(&root.join("repo")).unwrap();
        let storage = root.join("storage");
        fs::create_dir(&storage).unwrap();
        Fixture {
            _dir: dir,
            repo,
            storage,
            root,
        }
    }

    impl Fixture {
        fn source(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
            let dir = self.root.join(name);
            for (path, content) in files {
                let path = dir.join(path);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, content).unwrap();
            }
            fs::create_dir_all(&dir).unwrap();
            dir
        }

        fn publish(&self, source: &Path, id: i64, name: &str) -> Result<PublishReport> {
            publish(
                &self.repo,
                &PublishOptions {
                    storage: &self.storage,
                    url_base: "http://x/",
                    source,
                    version_name: name,
                    version_id: id,
                },
            )
        }

        fn blobs(&self) -> Vec<String> {
            let mut names: Vec<_> = fs::read_dir(&self.storage)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect();
            names.sort();
            names
        }
    }

    fn short(content: &str) -> String {
        hash_bytes(content.as_bytes()).to_hex()[..4].to_string()
    }

    #[test]
    fn test_publish_end_to_end() {
        let fx = fixture();
        let v1 = fx.source("v1", &[("a.txt", "alpha"), ("b.txt", "beta")]);

        let report = fx.publish(&v1, 1, "1.0").unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(report.reused, 0);

        let a_blob = format!("{}-a.txt", short("alpha"));
        let b_blob = format!("{}-b.txt", short("beta"));
        let mut expected = vec![a_blob.clone(), b_blob.clone()];
        expected.sort();
        assert_eq!(fx.blobs(), expected);
        assert_eq!(fs::read_to_string(fx.storage.join(&a_blob)).unwrap(), "alpha");

        let manifest = read_version(fx.repo.path(), 1).unwrap();
        assert_eq!(manifest, report.version);
        assert_eq!(manifest.name, "1.0");
        assert_eq!(manifest.files.len(), 2);
        assert_eq!(manifest.files[0].install_path, "a.txt");
        assert_eq!(manifest.files[0].content_hash, hash_bytes(b"alpha"));
        assert_eq!(manifest.files[0].sources[0].url, format!("http://x/{}", a_blob));
        assert_eq!(manifest.files[1].sources[0].url, format!("http://x/{}", b_blob));

        let index = fx.repo.load_index().unwrap();
        assert_eq!(index.versions.len(), 1);
        assert_eq!(index.version(1).unwrap().name, "1.0");

        // second version shares a.txt
        let v2 = fx.source("v2", &[("a.txt", "alpha")]);
        let report = fx.publish(&v2, 2, "2.0").unwrap();
        assert_eq!(report.added, 0);
        assert_eq!(report.reused, 1);
        assert_eq!(fx.blobs().len(), 2);
        assert_eq!(report.version.files[0].sources[0].url, format!("http://x/{}", a_blob));
        assert_eq!(fx.repo.load_index().unwrap().versions.len(), 2);
    }

    #[test]
    fn test_publish_same_tree_twice_is_idempotent() {
        let fx = fixture();
        let src = fx.source("src", &[("a", "1"), ("lib/b", "2"), ("lib/c", "3")]);

        let first = fx.publish(&src, 1, "1").unwrap();
        let blobs = fx.blobs();
        let second = fx.publish(&src, 2, "2").unwrap();

        assert_eq!(second.added, 0);
        assert_eq!(fx.blobs(), blobs);
        let urls = |r: &PublishReport| {
            r.version
                .files
                .iter()
                .map(|f| f.sources[0].url.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(urls(&first), urls(&second));
    }

    #[test]
    fn test_publish_equal_content_shares_blob() {
        let fx = fixture();
        let src = fx.source("src", &[("x/one.dat", "same"), ("y/two.dat", "same")]);

        let report = fx.publish(&src, 1, "1").unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(fx.blobs().len(), 1);
        assert_eq!(
            report.version.files[0].sources[0].url,
            report.version.files[1].sources[0].url
        );
        assert_eq!(report.version.files[1].install_path, "y/two.dat");
    }

    #[test]
    fn test_publish_resolves_name_collision() {
        let fx = fixture();
        // an unrelated blob already sits at the short name
        let taken = format!("{}-a.txt", short("fresh"));
        fs::write(fx.storage.join(&taken), "unrelated").unwrap();

        let src = fx.source("src", &[("a.txt", "fresh")]);
        let report = fx.publish(&src, 1, "1").unwrap();

        let hex = hash_bytes(b"fresh").to_hex();
        let expected = format!("{}-a.txt", &hex[..5]);
        assert_eq!(report.version.files[0].sources[0].url, format!("http://x/{}", expected));
        assert_eq!(fs::read_to_string(fx.storage.join(&expected)).unwrap(), "fresh");
        assert_eq!(fs::read_to_string(fx.storage.join(&taken)).unwrap(), "unrelated");
    }

    #[test]
    fn test_publish_existing_version_fails() {
        let fx = fixture();
        let v1 = fx.source("v1", &[("a.txt", "alpha")]);
        fx.publish(&v1, 1, "1.0").unwrap();

        let manifest_before = fs::read(version_path(fx.repo.path(), 1)).unwrap();
        let index_before = fs::read(fx.repo.index_path()).unwrap();
        let blobs_before = fx.blobs();

        let other = fx.source("other", &[("new.txt", "other")]);
        let result = fx.publish(&other, 1, "1.0-again");
        assert!(matches!(result, Err(Error::VersionAlreadyExists(1))));

        assert_eq!(fs::read(version_path(fx.repo.path(), 1)).unwrap(), manifest_before);
        assert_eq!(fs::read(fx.repo.index_path()).unwrap(), index_before);
        assert_eq!(fx.blobs(), blobs_before);
    }

    #[test]
    fn test_publish_orphan_manifest_blocks_id() {
        let fx = fixture();
        fs::write(version_path(fx.repo.path(), 5), "{}").unwrap();
        let src = fx.source("src", &[("a", "a")]);

        let result = fx.publish(&src, 5, "5");
        assert!(matches!(result, Err(Error::VersionAlreadyExists(5))));
        assert!(fx.repo.load_index().unwrap().versions.is_empty());
    }

    #[test]
    fn test_publish_invalid_directories() {
        let fx = fixture();
        let src = fx.source("src", &[("a", "a")]);
        let missing = fx.root.join("missing");

        let result = publish(
            &fx.repo,
            &PublishOptions {
                storage: &missing,
                url_base: "http://x",
                source: &src,
                version_name: "1",
                version_id: 1,
            },
        );
        assert!(matches!(result, Err(Error::StorageDirectoryInvalid(_))));

        let result = fx.publish(&missing, 1, "1");
        assert!(matches!(result, Err(Error::SourceDirectoryInvalid(_))));

        let result = fx.publish(&src, -1, "1");
        assert!(matches!(result, Err(Error::BadArgument(_))));

        assert!(fx.repo.load_index().unwrap().versions.is_empty());
    }

    #[test]
    fn test_publish_corrupt_index_touches_nothing() {
        let fx = fixture();
        fs::write(fx.repo.index_path(), "garbage").unwrap();
        let src = fx.source("src", &[("a", "a")]);

        let result = fx.publish(&src, 1, "1");
        assert!(matches!(result, Err(Error::RepositoryMalformed { .. })));
        assert!(fx.blobs().is_empty());
        assert!(!version_path(fx.repo.path(), 1).exists());
        assert_eq!(fs::read_to_string(fx.repo.index_path()).unwrap(), "garbage");
    }

    #[test]
    fn test_publish_normalizes_url_base() {
        let fx = fixture();
        let src = fx.source("src", &[("a.txt", "alpha")]);

        let report = publish(
            &fx.repo,
            &PublishOptions {
                storage: &fx.storage,
                url_base: "https://cdn.example.com/files",
                source: &src,
                version_name: "1",
                version_id: 1,
            },
        )
        .unwrap();
        assert_eq!(
            report.version.files[0].sources[0].url,
            format!("https://cdn.example.com/files/{}-a.txt", short("alpha"))
        );
    }

    #[test]
    fn test_publish_keeps_channels() {
        let fx = fixture();
        set_channel(&fx.repo, "stable", Some(0)).unwrap();
        let src = fx.source("src", &[("a", "a")]);

        fx.publish(&src, 1, "1").unwrap();
        let index = fx.repo.load_index().unwrap();
        assert_eq!(index.channel("stable").unwrap().pinned_version(), Some(0));
        assert_eq!(index.versions.len(), 1);
    }

    #[test]
    fn test_publish_respects_excludes() {
        let fx = fixture();
        fs::write(
            fx.repo.path().join(crate::config::CONFIG_FILE_NAME),
            "exclude = [\"*.pdb\"]\n",
        )
        .unwrap();
        let repo = Repo::open(fx.repo.path()).unwrap();
        let src = fx.source("src", &[("app.exe", "exe"), ("app.pdb", "symbols")]);

        let report = publish(
            &repo,
            &PublishOptions {
                storage: &fx.storage,
                url_base: "http://x/",
                source: &src,
                version_name: "1",
                version_id: 1,
            },
        )
        .unwrap();
        assert_eq!(report.version.files.len(), 1);
        assert_eq!(report.version.files[0].install_path, "app.exe");
    }

    #[test]
    fn test_publish_while_locked() {
        let fx = fixture();
        let src = fx.source("src", &[("a", "a")]);
        let _lock = fx.repo.lock().unwrap();

        let result = fx.publish(&src, 1, "1");
        assert!(matches!(result, Err(Error::LockContention)));
    }

    /// hasher that reports a file the source tree doesn't contain
    struct PhantomHasher;

    impl TreeHasher for PhantomHasher {
        fn hash_tree(&self, root: &Path) -> Result<Vec<FileHash>> {
            let mut files = Sha256TreeHasher::new().hash_tree(root)?;
            if root.ends_with("src") {
                files.push(FileHash::new("ghost.txt", hash_bytes(b"ghost")));
            }
            Ok(files)
        }
    }

    #[test]
    fn test_publish_read_failure_leaves_index_untouched() {
        let fx = fixture();
        let src = fx.source("src", &[("a", "a")]);
        let options = PublishOptions {
            storage: &fx.storage,
            url_base: "http://x/",
            source: &src,
            version_name: "1",
            version_id: 1,
        };

        let result = publish_with_hasher(&fx.repo, &options, &PhantomHasher);
        assert!(matches!(result, Err(Error::FileRead { path, .. }) if path == src.join("ghost.txt")));
        assert!(!version_path(fx.repo.path(), 1).exists());
        assert!(fx.repo.load_index().unwrap().versions.is_empty());
    }

    /// hasher that makes index.json unreplaceable once publish has loaded it
    struct IndexBlockingHasher {
        index: PathBuf,
    }

    impl TreeHasher for IndexBlockingHasher {
        fn hash_tree(&self, root: &Path) -> Result<Vec<FileHash>> {
            if root.ends_with("storage") {
                let previous = fs::read(&self.index).unwrap();
                fs::remove_file(&self.index).unwrap();
                fs::create_dir(&self.index).unwrap();
                fs::write(self.index.join("previous"), previous).unwrap();
            }
            Sha256TreeHasher::new().hash_tree(root)
        }
    }

    #[test]
    fn test_publish_index_save_failure_keeps_manifest() {
        let fx = fixture();
        set_channel(&fx.repo, "stable", Some(0)).unwrap();
        let before = fs::read(fx.repo.index_path()).unwrap();
        let src = fx.source("src", &[("a.txt", "a")]);
        let options = PublishOptions {
            storage: &fx.storage,
            url_base: "http://x/",
            source: &src,
            version_name: "1.0",
            version_id: 1,
        };
        let hasher = IndexBlockingHasher {
            index: fx.repo.index_path(),
        };

        let result = publish_with_hasher(&fx.repo, &options, &hasher);
        assert!(matches!(result, Err(Error::FileWrite { path, .. }) if path == fx.repo.index_path()));

        // blobs and manifest were written before the index
        assert_eq!(fx.blobs(), vec![format!("{}-a.txt", short("a"))]);
        assert_eq!(read_version(fx.repo.path(), 1).unwrap().name, "1.0");

        // the old index is untouched and no temp file is left
        assert!(fx.repo.index_path().is_dir());
        assert_eq!(fs::read(fx.repo.index_path().join("previous")).unwrap(), before);
        let mut names: Vec<_> = fs::read_dir(fx.repo.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec![".repoman.lock", "1.json", "index.json"]);

        // once the index is back, the orphan manifest still blocks the id
        fs::remove_dir_all(fx.repo.index_path()).unwrap();
        fs::write(fx.repo.index_path(), &before).unwrap();
        assert!(fx.repo.load_index().unwrap().versions.is_empty());
        assert!(matches!(
            fx.publish(&src, 1, "1.0"),
            Err(Error::VersionAlreadyExists(1))
        ));
    }
}
