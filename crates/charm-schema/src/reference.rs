//! Charm references and fully-resolved charm URLs.
//!
//! Text forms accepted by [`Reference::parse`]:
//!
//! ```text
//! [cs:|local:][~user/][series/]name[-revision]
//! ```

use std::fmt::{self, Write as _};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{EntityKind, Schema};

static USER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-zA-Z0-9+.-]+$").expect("static user pattern"));

static SERIES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]+([a-z0-9]+)?$").expect("static series pattern"));

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]*[a-z][a-z0-9]*)*$").expect("static name pattern")
});

/// Errors produced while parsing or narrowing a reference.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// Empty input, empty path segments or too many segments.
    #[error("charm or bundle URL has invalid form: \"{0}\"")]
    InvalidForm(String),

    /// A schema prefix other than `cs:` or `local:`.
    #[error("charm or bundle URL has invalid schema: \"{0}\"")]
    InvalidSchema(String),

    /// `local:` references cannot name an owner.
    #[error("local charm or bundle URL with user name: \"{0}\"")]
    LocalUser(String),

    /// The `~user` segment does not satisfy the user name rules.
    #[error("charm or bundle URL has invalid user name: \"{0}\"")]
    InvalidUser(String),

    /// The series segment does not satisfy the series rules.
    #[error("charm or bundle URL has invalid series: \"{0}\"")]
    InvalidSeries(String),

    /// The name segment does not satisfy the name rules.
    #[error("URL has invalid charm or bundle name: \"{0}\"")]
    InvalidName(String),

    /// The revision suffix does not fit in a revision number.
    #[error("charm or bundle URL has invalid revision: \"{0}\"")]
    InvalidRevision(String),

    /// A resolved URL was requested from a reference missing its series or revision.
    #[error("charm or bundle URL is not fully resolved: \"{0}\"")]
    Unresolved(String),
}

/// A possibly partial pointer to a charm or bundle, as typed by a user.
///
/// # Example
///
/// ```
/// use charm_schema::Reference;
///
/// let r = Reference::parse("~who/trusty/mysql-42").unwrap();
/// assert_eq!(r.user(), Some("who"));
/// assert_eq!(r.series(), Some("trusty"));
/// assert_eq!(r.name(), "mysql");
/// assert_eq!(r.revision(), Some(42));
/// assert_eq!(r.to_string(), "cs:~who/trusty/mysql-42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reference {
    schema: Schema,
    user: Option<String>,
    series: Option<String>,
    name: String,
    revision: Option<u32>,
}

impl Reference {
    /// Parse a reference from its textual form.
    ///
    /// # Errors
    ///
    /// Returns a [`ReferenceError`] describing the first malformed component.
    pub fn parse(s: &str) -> Result<Self, ReferenceError> {
        let (schema, path) = match s.split_once(':') {
            Some((prefix, rest)) => {
                let schema = prefix
                    .parse::<Schema>()
                    .map_err(|_| ReferenceError::InvalidSchema(s.to_string()))?;
                (schema, rest)
            }
            None => (Schema::CharmStore, s),
        };

        let mut parts: Vec<&str> = path.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) || parts.len() > 3 {
            return Err(ReferenceError::InvalidForm(s.to_string()));
        }

        let user = match parts.first().and_then(|p| p.strip_prefix('~')) {
            Some(user) => {
                if schema == Schema::Local {
                    return Err(ReferenceError::LocalUser(s.to_string()));
                }
                if !USER_RE.is_match(user) {
                    return Err(ReferenceError::InvalidUser(user.to_string()));
                }
                let user = user.to_string();
                parts.remove(0);
                Some(user)
            }
            None => None,
        };

        let (series, name_rev) = match parts.as_slice() {
            [series, name] => (Some(*series), *name),
            [name] => (None, *name),
            _ => return Err(ReferenceError::InvalidForm(s.to_string())),
        };

        if let Some(series) = series {
            validate_series(series)?;
        }

        let (name, revision) = split_revision(name_rev)?;
        validate_name(name)?;

        Ok(Self {
            schema,
            user,
            series: series.map(str::to_string),
            name: name.to_string(),
            revision,
        })
    }

    /// The schema this reference lives under.
    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Owner of the entity, if given.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Series, if given.
    pub fn series(&self) -> Option<&str> {
        self.series.as_deref()
    }

    /// Charm or bundle name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pinned revision, if given.
    pub fn revision(&self) -> Option<u32> {
        self.revision
    }

    /// The entity kind, known only when the series is.
    pub fn kind(&self) -> Option<EntityKind> {
        self.series.as_deref().map(EntityKind::from_series)
    }

    /// Return a copy pinned to `revision` (or unpinned when `None`).
    pub fn with_revision(&self, revision: Option<u32>) -> Self {
        Self {
            revision,
            ..self.clone()
        }
    }

    /// Return a copy with the revision dropped, pointing at the latest one.
    pub fn without_revision(&self) -> Self {
        self.with_revision(None)
    }

    /// Schema-less path used on the wire, e.g. `~who/trusty/mysql-0`.
    pub fn path(&self) -> String {
        format_path(
            self.user.as_deref(),
            self.series.as_deref(),
            &self.name,
            self.revision,
        )
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.schema, self.path())
    }
}

impl FromStr for Reference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Reference {
    type Error = ReferenceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Reference> for String {
    fn from(r: Reference) -> Self {
        r.to_string()
    }
}

/// A fully-resolved, revision-pinned charm or bundle URL.
///
/// Series and revision are always present, and the entity kind is fixed at
/// construction. The same URL always denotes the same archive bytes.
///
/// # Example
///
/// ```
/// use charm_schema::{CharmUrl, EntityKind, Reference};
///
/// let reference = Reference::parse("cs:~who/trusty/mysql-0").unwrap();
/// let url = CharmUrl::try_from(reference).unwrap();
/// assert_eq!(url.revision(), 0);
/// assert_eq!(url.kind(), EntityKind::Charm);
///
/// // Missing pieces cannot be narrowed.
/// assert!(CharmUrl::try_from(Reference::parse("~who/mysql").unwrap()).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CharmUrl {
    schema: Schema,
    user: Option<String>,
    series: String,
    name: String,
    revision: u32,
    kind: EntityKind,
}

impl CharmUrl {
    /// Build a charm store URL from its components.
    ///
    /// # Errors
    ///
    /// Returns a [`ReferenceError`] if any component is malformed.
    pub fn new(
        user: Option<&str>,
        series: &str,
        name: &str,
        revision: u32,
    ) -> Result<Self, ReferenceError> {
        if let Some(user) = user {
            if !USER_RE.is_match(user) {
                return Err(ReferenceError::InvalidUser(user.to_string()));
            }
        }
        validate_series(series)?;
        validate_name(name)?;

        Ok(Self {
            schema: Schema::CharmStore,
            user: user.map(str::to_string),
            series: series.to_string(),
            name: name.to_string(),
            revision,
            kind: EntityKind::from_series(series),
        })
    }

    /// The schema this URL lives under.
    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Owner of the entity, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Series of the entity (`bundle` for bundles).
    pub fn series(&self) -> &str {
        &self.series
    }

    /// Charm or bundle name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pinned revision.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Whether this URL denotes a charm or a bundle.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Return a copy pinned to another revision of the same entity.
    pub fn with_revision(&self, revision: u32) -> Self {
        Self {
            revision,
            ..self.clone()
        }
    }

    /// Widen back into a [`Reference`] with every component present.
    pub fn to_reference(&self) -> Reference {
        Reference {
            schema: self.schema,
            user: self.user.clone(),
            series: Some(self.series.clone()),
            name: self.name.clone(),
            revision: Some(self.revision),
        }
    }

    /// Schema-less path used on the wire, e.g. `~who/trusty/mysql-0`.
    pub fn path(&self) -> String {
        format_path(
            self.user.as_deref(),
            Some(&self.series),
            &self.name,
            Some(self.revision),
        )
    }
}

impl TryFrom<Reference> for CharmUrl {
    type Error = ReferenceError;

    fn try_from(r: Reference) -> Result<Self, Self::Error> {
        let text = r.to_string();
        let (Some(series), Some(revision)) = (r.series, r.revision) else {
            return Err(ReferenceError::Unresolved(text));
        };
        Ok(Self {
            schema: r.schema,
            user: r.user,
            kind: EntityKind::from_series(&series),
            series,
            name: r.name,
            revision,
        })
    }
}

impl fmt::Display for CharmUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.schema, self.path())
    }
}

impl FromStr for CharmUrl {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(Reference::parse(s)?)
    }
}

impl TryFrom<String> for CharmUrl {
    type Error = ReferenceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CharmUrl> for String {
    fn from(url: CharmUrl) -> Self {
        url.to_string()
    }
}

/// Translate a URL string into one that can be used safely as a file name.
///
/// ASCII letters, ASCII digits, dot and dash are kept; every other byte is
/// written as its hex value surrounded by underscores.
///
/// # Example
///
/// ```
/// use charm_schema::quote;
///
/// assert_eq!(quote("cs:~who/trusty/mysql-0"), "cs_3a__7e_who_2f_trusty_2f_mysql-0");
/// ```
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || b == b'.' || b == b'-' {
            out.push(char::from(b));
        } else {
            let _ = write!(out, "_{b:02x}_");
        }
    }
    out
}

fn format_path(
    user: Option<&str>,
    series: Option<&str>,
    name: &str,
    revision: Option<u32>,
) -> String {
    let mut path = String::new();
    if let Some(user) = user {
        let _ = write!(path, "~{user}/");
    }
    if let Some(series) = series {
        let _ = write!(path, "{series}/");
    }
    path.push_str(name);
    if let Some(revision) = revision {
        let _ = write!(path, "-{revision}");
    }
    path
}

fn validate_series(series: &str) -> Result<(), ReferenceError> {
    if SERIES_RE.is_match(series) {
        Ok(())
    } else {
        Err(ReferenceError::InvalidSeries(series.to_string()))
    }
}

fn validate_name(name: &str) -> Result<(), ReferenceError> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(ReferenceError::InvalidName(name.to_string()))
    }
}

/// Split a trailing `-<digits>` revision off a name.
fn split_revision(name: &str) -> Result<(&str, Option<u32>), ReferenceError> {
    match name.rsplit_once('-') {
        Some((base, digits))
            if !base.is_empty()
                && !digits.is_empty()
                && digits.bytes().all(|b| b.is_ascii_digit()) =>
        {
            let revision = digits
                .parse::<u32>()
                .map_err(|_| ReferenceError::InvalidRevision(name.to_string()))?;
            Ok((base, Some(revision)))
        }
        _ => Ok((name, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_reference() {
        let r = Reference::parse("cs:~who/trusty/mysql-42").unwrap();
        assert_eq!(r.schema(), Schema::CharmStore);
        assert_eq!(r.user(), Some("who"));
        assert_eq!(r.series(), Some("trusty"));
        assert_eq!(r.name(), "mysql");
        assert_eq!(r.revision(), Some(42));
        assert_eq!(r.kind(), Some(EntityKind::Charm));
    }

    #[test]
    fn parse_partial_references() {
        let r = Reference::parse("~who/mysql").unwrap();
        assert_eq!(r.user(), Some("who"));
        assert_eq!(r.series(), None);
        assert_eq!(r.revision(), None);
        assert_eq!(r.kind(), None);
        assert_eq!(r.to_string(), "cs:~who/mysql");

        let r = Reference::parse("trusty/django").unwrap();
        assert_eq!(r.user(), None);
        assert_eq!(r.series(), Some("trusty"));
        assert_eq!(r.to_string(), "cs:trusty/django");

        let r = Reference::parse("no-such").unwrap();
        assert_eq!(r.name(), "no-such");
        assert_eq!(r.revision(), None);
    }

    #[test]
    fn dashed_names_keep_non_numeric_suffix() {
        let r = Reference::parse("trusty/no-such-42").unwrap();
        assert_eq!(r.name(), "no-such");
        assert_eq!(r.revision(), Some(42));

        let r = Reference::parse("trusty/wordpress-k8s").unwrap();
        assert_eq!(r.name(), "wordpress-k8s");
        assert_eq!(r.revision(), None);
    }

    #[test]
    fn bundle_series_sets_kind() {
        let r = Reference::parse("cs:bundle/django").unwrap();
        assert_eq!(r.kind(), Some(EntityKind::Bundle));

        let url: CharmUrl = "cs:bundle/django-3".parse().unwrap();
        assert_eq!(url.kind(), EntityKind::Bundle);
    }

    #[test]
    fn malformed_references_are_rejected() {
        assert!(matches!(Reference::parse(""), Err(ReferenceError::InvalidForm(_))));
        assert!(matches!(Reference::parse("a//b"), Err(ReferenceError::InvalidForm(_))));
        assert!(matches!(Reference::parse("~u/a/b/c"), Err(ReferenceError::InvalidForm(_))));
        assert!(matches!(Reference::parse("~who"), Err(ReferenceError::InvalidForm(_))));
        assert!(matches!(Reference::parse("http:foo"), Err(ReferenceError::InvalidSchema(_))));
        assert!(matches!(Reference::parse("local:~who/foo"), Err(ReferenceError::LocalUser(_))));
        assert!(matches!(Reference::parse("~_x/foo"), Err(ReferenceError::InvalidUser(_))));
        assert!(matches!(Reference::parse("Trusty/foo"), Err(ReferenceError::InvalidSeries(_))));
        assert!(matches!(Reference::parse("trusty/Foo"), Err(ReferenceError::InvalidName(_))));
        assert!(matches!(Reference::parse("trusty/9foo"), Err(ReferenceError::InvalidName(_))));
        assert!(matches!(
            Reference::parse("trusty/foo-99999999999"),
            Err(ReferenceError::InvalidRevision(_))
        ));
    }

    #[test]
    fn malformed_error_names_input() {
        let err = Reference::parse("a//b").unwrap_err();
        assert_eq!(err.to_string(), r#"charm or bundle URL has invalid form: "a//b""#);
    }

    #[test]
    fn local_references() {
        let r = Reference::parse("local:precise/wordpress-3").unwrap();
        assert_eq!(r.schema(), Schema::Local);
        assert_eq!(r.to_string(), "local:precise/wordpress-3");
    }

    #[test]
    fn narrowing_requires_series_and_revision() {
        let unresolved = Reference::parse("~who/trusty/mysql").unwrap();
        assert_eq!(
            CharmUrl::try_from(unresolved),
            Err(ReferenceError::Unresolved("cs:~who/trusty/mysql".to_string()))
        );

        let no_series = Reference::parse("~who/mysql-3").unwrap();
        assert!(CharmUrl::try_from(no_series).is_err());

        let url = CharmUrl::try_from(Reference::parse("~who/trusty/mysql-3").unwrap()).unwrap();
        assert_eq!(url.to_string(), "cs:~who/trusty/mysql-3");
        assert_eq!(url.path(), "~who/trusty/mysql-3");
    }

    #[test]
    fn widening_round_trips() {
        let url = CharmUrl::new(Some("dalek"), "utopic", "riak", 2).unwrap();
        let reference = url.to_reference();
        assert_eq!(reference.to_string(), url.to_string());
        assert_eq!(CharmUrl::try_from(reference).unwrap(), url);
        assert_eq!(url.to_reference().without_revision().to_string(), "cs:~dalek/utopic/riak");
    }

    #[test]
    fn new_validates_components() {
        assert!(CharmUrl::new(None, "trusty", "mysql", 0).is_ok());
        assert!(CharmUrl::new(None, "Trusty", "mysql", 0).is_err());
        assert!(CharmUrl::new(None, "trusty", "my_sql", 0).is_err());
        assert!(CharmUrl::new(Some("-x"), "trusty", "mysql", 0).is_err());
    }

    #[test]
    fn serde_uses_canonical_text() {
        let url = CharmUrl::new(Some("who"), "trusty", "mysql", 1).unwrap();
        let json = serde_json::to_string(&url).unwrap();
        assert_eq!(json, r#""cs:~who/trusty/mysql-1""#);
        let back: CharmUrl = serde_json::from_str(&json).unwrap();
        assert_eq!(back, url);

        let bad: Result<CharmUrl, _> = serde_json::from_str(r#""cs:~who/mysql""#);
        assert!(bad.is_err());
    }

    #[test]
    fn quote_escapes_separators() {
        assert_eq!(quote("cs:trusty/django-3"), "cs_3a_trusty_2f_django-3");
        assert_eq!(quote("abc.DEF-1"), "abc.DEF-1");
    }
}
