//! On-disk archive cache keyed by resolved charm URL.
//!
//! Each entry is a single file named after the quoted URL. An entry is only
//! trusted when its SHA-384 matches the hash the store declares for that URL,
//! so a truncated or tampered file is re-downloaded rather than served.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use charm_schema::{CharmUrl, Sha384Hash, quote};

use crate::error::{RepoError, Result};
use crate::integrity;

/// A verified archive held in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// URL the archive was stored under.
    pub url: CharmUrl,
    /// Location of the archive file.
    pub path: PathBuf,
    /// SHA-384 of the file content.
    pub hash: Sha384Hash,
}

/// Directory of cached charm archives.
#[derive(Debug, Clone)]
pub struct CharmCache {
    root: PathBuf,
}

impl CharmCache {
    /// Cache rooted at `root`. Nothing is created until [`Self::ensure_root`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory and any missing parents.
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|source| RepoError::CacheDir {
            path: self.root.clone(),
            source,
        })
    }

    /// File the archive for `url` lives at, present or not.
    pub fn path_for(&self, url: &CharmUrl) -> PathBuf {
        self.root.join(format!("{}.charm", quote(&url.to_string())))
    }

    /// Find the entry for `url`, recording `expected` as the hash it must have.
    ///
    /// A miss is not an error. The file content is not checked here; see
    /// [`Self::validate`].
    pub fn lookup(&self, url: &CharmUrl, expected: &Sha384Hash) -> Option<CacheEntry> {
        let path = self.path_for(url);
        path.is_file().then(|| CacheEntry {
            url: url.clone(),
            path,
            hash: expected.clone(),
        })
    }

    /// Re-hash the entry's file and compare it with the recorded hash.
    pub fn validate(&self, entry: &CacheEntry) -> bool {
        match integrity::hash_file(&entry.path) {
            Ok(actual) if actual == entry.hash => true,
            Ok(actual) => {
                tracing::warn!(
                    "Cached archive {} has hash {}, expected {}; refetching",
                    entry.path.display(),
                    actual,
                    entry.hash
                );
                false
            }
            Err(e) => {
                tracing::warn!("Cannot read cached archive {}: {}", entry.path.display(), e);
                false
            }
        }
    }

    /// Write verified archive bytes for `url`, replacing any previous entry.
    ///
    /// The bytes land in a temporary file inside the root first and are then
    /// renamed into place, so readers never observe a partial archive.
    pub fn store(&self, url: &CharmUrl, data: &[u8], hash: &Sha384Hash) -> Result<CacheEntry> {
        let path = self.path_for(url);
        let write_err = |source: io::Error| RepoError::CacheWrite {
            path: path.clone(),
            source,
        };

        let mut tmp = tempfile::Builder::new()
            .prefix("charm-download")
            .tempfile_in(&self.root)
            .map_err(write_err)?;
        tmp.write_all(data).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;

        tracing::debug!("Cached {} at {}", url, path.display());
        Ok(CacheEntry {
            url: url.clone(),
            path,
            hash: hash.clone(),
        })
    }
}
