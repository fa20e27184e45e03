//! charmrepo - charm store client CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use charm_cli::cmd;
use charm_cli::{Cli, Commands};
use charm_core::CharmStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let repo = CharmStore::new(cli.store_params());
    tracing::debug!(
        "Using charm store {} with cache {}",
        repo.url(),
        repo.cache().root().display()
    );

    match cli.command {
        Commands::Resolve { reference } => cmd::resolve::resolve(&repo, &reference).await,
        Commands::Latest { references } => cmd::latest::latest(&repo, &references).await,
        Commands::Get { reference } => cmd::get::get(&repo, &reference).await,
    }
}
