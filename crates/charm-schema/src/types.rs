//! Entity kinds and reference schemas.

use serde::{Deserialize, Serialize};

/// Series name reserved for bundles.
pub const BUNDLE_SERIES: &str = "bundle";

/// What a reference points at: a single charm or a multi-charm bundle.
///
/// The kind is derived from the series when a [`Reference`](crate::Reference)
/// or [`CharmUrl`](crate::CharmUrl) is built, so callers never have to
/// sniff series strings or error messages to tell the two apart.
///
/// # Example
///
/// ```
/// use charm_schema::EntityKind;
///
/// assert_eq!(EntityKind::from_series("bundle"), EntityKind::Bundle);
/// assert_eq!(EntityKind::from_series("trusty"), EntityKind::Charm);
/// assert_eq!(EntityKind::Charm.to_string(), "charm");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A standalone charm (default).
    #[default]
    Charm,
    /// A bundle of charms deployed together.
    Bundle,
}

impl EntityKind {
    /// Derive the kind from a series name.
    pub fn from_series(series: &str) -> Self {
        if series == BUNDLE_SERIES {
            Self::Bundle
        } else {
            Self::Charm
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Charm => "charm",
            Self::Bundle => "bundle",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// URL schema prefix of a reference (`cs:` or `local:`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Schema {
    /// The remote charm store (`cs:`), assumed when no prefix is given.
    #[default]
    #[serde(rename = "cs")]
    CharmStore,
    /// A local repository (`local:`). Local references never carry an owner.
    Local,
}

impl Schema {
    /// Convert to string representation (without the trailing colon).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CharmStore => "cs",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Schema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cs" => Ok(Self::CharmStore),
            "local" => Ok(Self::Local),
            _ => Err(format!("unknown schema: {s}")),
        }
    }
}
