//! Subcommand implementations.

pub mod get;
pub mod latest;
pub mod resolve;

use anyhow::{Context, Result};
use charm_schema::Reference;

/// Parse user input into a reference, naming the input on failure.
pub fn parse_reference(text: &str) -> Result<Reference> {
    text.parse()
        .with_context(|| format!("Invalid charm reference '{text}'"))
}
