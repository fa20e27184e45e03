//! Get command

use std::io::Write;

use anyhow::Result;
use charm_core::Repository;
use crossterm::style::Stylize;

use super::parse_reference;

/// Fetch a charm into the cache and describe it.
pub async fn get(repo: &impl Repository, reference: &str) -> Result<()> {
    write_get(repo, reference, &mut std::io::stdout()).await
}

pub async fn write_get(
    repo: &impl Repository,
    reference: &str,
    out: &mut impl Write,
) -> Result<()> {
    let reference = parse_reference(reference)?;
    let charm = repo.get(&reference).await?;
    let meta = charm.meta();

    let lw = 12;
    writeln!(out)?;
    match charm.revision() {
        Some(rev) => writeln!(out, "  {} {}", meta.name.as_str().white().bold(), rev.to_string().dark_grey())?,
        None => writeln!(out, "  {}", meta.name.as_str().white().bold())?,
    }
    if !meta.summary.is_empty() {
        writeln!(out, "  {}", meta.summary)?;
    }
    writeln!(out)?;
    writeln!(out, "  {:<lw$}{}", "archive", charm.path().display())?;
    if meta.subordinate {
        writeln!(out, "  {:<lw$}yes", "subordinate")?;
    }
    for (label, relations) in [
        ("provides", &meta.provides),
        ("requires", &meta.requires),
        ("peers", &meta.peers),
    ] {
        if !relations.is_empty() {
            let names: Vec<String> = relations
                .iter()
                .map(|(name, rel)| format!("{name}:{}", rel.interface))
                .collect();
            writeln!(out, "  {:<lw$}{}", label, names.join(", "))?;
        }
    }
    if !charm.config().options.is_empty() {
        let options: Vec<&str> = charm.config().options.keys().map(String::as_str).collect();
        writeln!(out, "  {:<lw$}{}", "options", options.join(", "))?;
    }
    if !charm.actions().0.is_empty() {
        let actions: Vec<&str> = charm.actions().0.keys().map(String::as_str).collect();
        writeln!(out, "  {:<lw$}{}", "actions", actions.join(", "))?;
    }
    Ok(())
}
