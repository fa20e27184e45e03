//! Domain-specific errors for store, cache and archive operations

use std::fmt;
use std::path::PathBuf;

use charm_schema::{EntityKind, ReferenceError, Sha384Hash};
use thiserror::Error;

/// The store has no charm or bundle matching a reference.
///
/// Kept separate from [`RepoError`] so batch lookups can report it per item
/// without failing the whole call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("charm or bundle not found: \"{url}\"")]
pub struct CharmNotFound {
    /// The reference or URL text that could not be found.
    pub url: String,
}

impl CharmNotFound {
    /// Create a not-found error for the given reference text.
    pub fn new(url: impl fmt::Display) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

/// Errors returned by [`Repository`](crate::Repository) operations.
#[derive(Error, Debug)]
pub enum RepoError {
    /// The reference text is not a valid charm or bundle URL.
    #[error(transparent)]
    MalformedReference(#[from] ReferenceError),

    /// The store has no matching entity.
    #[error(transparent)]
    NotFound(#[from] CharmNotFound),

    /// A charm was requested but the reference denotes a bundle, or vice versa.
    #[error("expected a {expected} URL, got {actual} URL \"{url}\"")]
    WrongEntityKind {
        /// Kind the caller asked for.
        expected: EntityKind,
        /// Kind the reference actually denotes.
        actual: EntityKind,
        /// The offending reference or URL.
        url: String,
    },

    /// The store answered with a structured error payload.
    #[error("{context}: {message}")]
    Remote {
        /// What the client was doing, e.g. `cannot get archive`.
        context: &'static str,
        /// The server's `Message`, verbatim.
        message: String,
        /// The server's `Code`, when present.
        code: Option<String>,
    },

    /// The store answered with a body the client could not decode.
    #[error("{context}: invalid response: {detail}")]
    InvalidResponse {
        /// What the client was doing.
        context: &'static str,
        /// Decoder message.
        detail: String,
    },

    /// Connection-level failure talking to the store.
    #[error("cannot reach the charm store: {0}")]
    Transport(#[from] reqwest::Error),

    /// Downloaded bytes do not match the declared content hash.
    #[error("hash mismatch; network corruption?")]
    HashMismatch {
        /// Hash declared by the store.
        expected: Sha384Hash,
        /// Hash of the bytes received.
        actual: Sha384Hash,
    },

    /// The cache root could not be created.
    #[error("cannot create the cache directory: {}: {source}", path.display())]
    CacheDir {
        /// The cache root.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A verified archive could not be written into the cache.
    #[error("cannot write {}: {source}", path.display())]
    CacheWrite {
        /// Destination path.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A cached file is not a readable charm archive.
    #[error("invalid charm archive {}: {detail}", path.display())]
    InvalidArchive {
        /// Archive path.
        path: PathBuf,
        /// What was wrong with it.
        detail: String,
    },

    /// Context wrapper added by [`Repository::get`](crate::Repository::get).
    #[error("cannot retrieve charm \"{url}\": {source}")]
    Retrieve {
        /// The reference being retrieved.
        url: String,
        /// The underlying failure.
        #[source]
        source: Box<RepoError>,
    },

    /// Context wrapper added by [`Repository::resolve`](crate::Repository::resolve).
    #[error("cannot resolve charm URL \"{url}\": {source}")]
    Resolve {
        /// The reference being resolved.
        url: String,
        /// The underlying failure.
        #[source]
        source: Box<RepoError>,
    },
}

impl RepoError {
    /// Wrap with the retrieval context for `url`.
    pub fn retrieving(self, url: impl fmt::Display) -> Self {
        Self::Retrieve {
            url: url.to_string(),
            source: Box::new(self),
        }
    }

    /// Wrap with the resolution context for `url`.
    pub fn resolving(self, url: impl fmt::Display) -> Self {
        Self::Resolve {
            url: url.to_string(),
            source: Box::new(self),
        }
    }

    /// The underlying error with any context wrappers stripped.
    pub fn cause(&self) -> &RepoError {
        match self {
            Self::Retrieve { source, .. } | Self::Resolve { source, .. } => source.cause(),
            other => other,
        }
    }

    /// Whether the underlying error is a not-found answer from the store.
    pub fn is_not_found(&self) -> bool {
        matches!(self.cause(), Self::NotFound(_))
    }
}

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepoError>;
