//! Latest command

use std::io::Write;

use anyhow::Result;
use charm_core::{Repository, RevisionResult};
use crossterm::style::Stylize;

use super::parse_reference;

/// Show the latest revision of each reference, one row per input.
pub async fn latest(repo: &impl Repository, references: &[String]) -> Result<()> {
    write_latest(repo, references, &mut std::io::stdout()).await
}

pub async fn write_latest(
    repo: &impl Repository,
    references: &[String],
    out: &mut impl Write,
) -> Result<()> {
    let refs = references
        .iter()
        .map(|r| parse_reference(r))
        .collect::<Result<Vec<_>>>()?;
    let results = repo.latest(&refs).await?;

    let width = references.iter().map(String::len).max().unwrap_or(0) + 2;
    for (reference, result) in references.iter().zip(&results) {
        write_row(out, reference, result, width)?;
    }
    Ok(())
}

fn write_row(out: &mut impl Write, reference: &str, result: &RevisionResult, width: usize) -> Result<()> {
    match result {
        Ok(rev) => writeln!(
            out,
            "  {:<width$}{:>6}  {}",
            reference,
            rev.revision,
            rev.sha256.as_str().dark_grey()
        )?,
        Err(e) => writeln!(out, "  {:<width$}{:>6}  {}", reference, "-", e.to_string().red())?,
    }
    Ok(())
}
