//! Resolve command

use std::io::Write;

use anyhow::Result;
use charm_core::Repository;

use super::parse_reference;

/// Print the fully-qualified URL a reference resolves to.
pub async fn resolve(repo: &impl Repository, reference: &str) -> Result<()> {
    write_resolve(repo, reference, &mut std::io::stdout()).await
}

pub async fn write_resolve(
    repo: &impl Repository,
    reference: &str,
    out: &mut impl Write,
) -> Result<()> {
    let reference = parse_reference(reference)?;
    let url = repo.resolve(&reference).await?;
    writeln!(out, "{url}")?;
    Ok(())
}
