//! Value types for addressing charms and bundles in a charm store.
//!
//! A [`Reference`] is what a user types: it may omit the owner, the series
//! or the revision. A [`CharmUrl`] is what the store answers with: every
//! component pinned. The only way from the former to the latter is
//! [`CharmUrl::try_from`], which the resolver calls once it has asked the
//! store to fill in the gaps.

pub mod hash;
pub mod reference;
pub mod types;

// Re-exports
pub use hash::*;
pub use reference::{CharmUrl, Reference, ReferenceError, quote};
pub use types::*;
