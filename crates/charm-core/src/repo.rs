//! Repository facade over the store client and the local cache.

use std::path::PathBuf;

use async_trait::async_trait;
use charm_schema::{CharmUrl, EntityKind, Reference};

use crate::archive::CharmArchive;
use crate::cache::CharmCache;
use crate::client::{CharmStoreClient, ResolvedCharm, RevisionResult};
use crate::error::{RepoError, Result};
use crate::paths;

/// A source of charms.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Fetch, verify and cache the charm `reference` resolves to.
    async fn get(&self, reference: &Reference) -> Result<CharmArchive>;

    /// Latest revision of each reference, positionally.
    ///
    /// Unknown entities are per-item errors, not a failure of the batch.
    async fn latest(&self, references: &[Reference]) -> Result<Vec<RevisionResult>>;

    /// Fully-qualified URL for a possibly partial reference.
    async fn resolve(&self, reference: &Reference) -> Result<CharmUrl>;
}

/// Settings for [`CharmStore::new`].
#[derive(Debug, Clone, Default)]
pub struct CharmStoreParams {
    /// Store base URL; the public store when `None`.
    pub url: Option<String>,
    /// Basic-auth user.
    pub user: Option<String>,
    /// Basic-auth password, sent only together with `user`.
    pub password: Option<String>,
    /// Archive cache directory; [`paths::cache_path`] when `None`.
    pub cache_dir: Option<PathBuf>,
    /// Suppress download counting on the store.
    pub test_mode: bool,
}

/// [`Repository`] backed by a remote charm store.
#[derive(Debug, Clone)]
pub struct CharmStore {
    client: CharmStoreClient,
    cache: CharmCache,
}

impl Default for CharmStore {
    fn default() -> Self {
        Self::new(CharmStoreParams::default())
    }
}

impl CharmStore {
    /// Build a repository from `params`.
    pub fn new(params: CharmStoreParams) -> Self {
        let url = params
            .url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| paths::DEFAULT_STORE_URL.to_string());
        let mut client = CharmStoreClient::new(url).with_test_mode(params.test_mode);
        if let Some(user) = params.user {
            client = client.with_credentials(user, params.password.unwrap_or_default());
        }
        let cache = CharmCache::new(params.cache_dir.unwrap_or_else(paths::cache_path));
        Self::from_parts(client, cache)
    }

    /// Build a repository from an already configured client and cache.
    pub fn from_parts(client: CharmStoreClient, cache: CharmCache) -> Self {
        Self { client, cache }
    }

    /// Base URL of the backing store.
    pub fn url(&self) -> &str {
        self.client.base_url()
    }

    /// The underlying store client.
    pub fn client(&self) -> &CharmStoreClient {
        &self.client
    }

    /// The archive cache.
    pub fn cache(&self) -> &CharmCache {
        &self.cache
    }

    /// A copy of this repository with test mode switched on or off.
    pub fn with_test_mode(&self, test_mode: bool) -> Self {
        Self {
            client: self.client.clone().with_test_mode(test_mode),
            cache: self.cache.clone(),
        }
    }

    async fn download(&self, resolved: &ResolvedCharm) -> Result<CharmArchive> {
        let archive = self
            .client
            .fetch_archive(&resolved.url, EntityKind::Charm)
            .await
            .map_err(|e| match e {
                RepoError::HashMismatch { .. } => e,
                other => other.retrieving(&resolved.url),
            })?;

        let entry = self
            .cache
            .store(&resolved.url, &archive.data, &archive.hash)?;
        CharmArchive::read(&entry.path)
    }
}

#[async_trait]
impl Repository for CharmStore {
    async fn get(&self, reference: &Reference) -> Result<CharmArchive> {
        if reference.kind() == Some(EntityKind::Bundle) {
            return Err(RepoError::WrongEntityKind {
                expected: EntityKind::Charm,
                actual: EntityKind::Bundle,
                url: reference.to_string(),
            });
        }
        self.cache.ensure_root()?;

        let resolved = self
            .client
            .resolve(reference)
            .await
            .map_err(|e| e.retrieving(reference))?;
        if resolved.url.kind() != EntityKind::Charm {
            return Err(RepoError::WrongEntityKind {
                expected: EntityKind::Charm,
                actual: resolved.url.kind(),
                url: resolved.url.to_string(),
            });
        }

        if let Some(entry) = self.cache.lookup(&resolved.url, &resolved.hash) {
            if self.cache.validate(&entry) {
                tracing::debug!("Cache hit for {}", resolved.url);
                return CharmArchive::read(&entry.path);
            }
        } else {
            tracing::debug!("Cache miss for {}", resolved.url);
        }

        self.download(&resolved).await
    }

    async fn latest(&self, references: &[Reference]) -> Result<Vec<RevisionResult>> {
        self.client.latest(references).await
    }

    async fn resolve(&self, reference: &Reference) -> Result<CharmUrl> {
        let resolved = self
            .client
            .resolve(reference)
            .await
            .map_err(|e| e.resolving(reference))?;
        Ok(resolved.url)
    }
}
