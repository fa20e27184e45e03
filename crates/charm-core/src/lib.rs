//! Client-side resolver and content-addressed cache for a remote charm store.
//!
//! # Architecture
//!
//! - [`client::CharmStoreClient`] talks to the store's HTTP API: reference
//!   resolution, batch revision lookup, archive download.
//! - [`integrity`] checks downloaded bytes against the store-declared SHA-384.
//! - [`cache::CharmCache`] keeps one verified archive per resolved
//!   [`CharmUrl`](charm_schema::CharmUrl) on disk.
//! - [`repo::CharmStore`] is the [`Repository`] facade tying them together.
//!
//! # Cache Layout
//!
//! ```text
//! <cache-dir>/
//! ├── cs_3a__7e_who_2f_trusty_2f_mysql-0.charm
//! └── cs_3a_precise_2f_wordpress-3.charm
//! ```

pub mod archive;
pub mod cache;
pub mod client;
pub mod error;
pub mod integrity;
pub mod paths;
pub mod repo;

pub use archive::CharmArchive;
pub use cache::{CacheEntry, CharmCache};
pub use client::{Archive, CharmRevision, CharmStoreClient, Credentials, ResolvedCharm, RevisionResult};
pub use error::{CharmNotFound, RepoError, Result};
pub use repo::{CharmStore, CharmStoreParams, Repository};

/// User Agent string for store requests
pub const USER_AGENT: &str = concat!("charmrepo/", env!("CARGO_PKG_VERSION"));
