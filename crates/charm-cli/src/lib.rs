//! charmrepo - command line access to a charm store
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
//!
//! Resolves charm references, reports latest revisions and downloads
//! verified charm archives into the local cache.
//!
//! # Cache Layout
//!
//! ```text
//! ~/.cache/charmrepo/
//! └── cs_3a_trusty_2f_mysql-38.charm
//! ```

pub mod cmd;

use std::path::PathBuf;

use charm_core::CharmStoreParams;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "charmrepo")]
#[command(author, version, about = "charmrepo - charm store client")]
pub struct Cli {
    /// Charm store API base URL
    #[arg(long, global = true, env = "CHARMSTORE_URL")]
    pub url: Option<String>,

    /// User name for basic authentication
    #[arg(long, global = true, env = "CHARMSTORE_USER")]
    pub user: Option<String>,

    /// Password for basic authentication
    #[arg(long, global = true, env = "CHARMSTORE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Directory holding downloaded archives
    #[arg(long, global = true, env = "CHARMREPO_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Do not count downloads in the store statistics
    #[arg(long, global = true, env = "CHARMREPO_TEST_MODE")]
    pub test_mode: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve a reference to a fully-qualified charm URL
    Resolve {
        /// Charm reference, e.g. `~who/mysql` or `trusty/wordpress-3`
        reference: String,
    },
    /// Show the latest revision of each charm
    Latest {
        /// Charm references
        #[arg(required = true)]
        references: Vec<String>,
    },
    /// Download (or reuse) a verified charm archive
    Get {
        /// Charm reference
        reference: String,
    },
}

impl Cli {
    /// Repository settings from the global flags.
    pub fn store_params(&self) -> CharmStoreParams {
        CharmStoreParams {
            url: self.url.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            cache_dir: self.cache_dir.clone(),
            test_mode: self.test_mode,
        }
    }
}
