//! Charm archive parsing.
//!
//! A charm archive is a zip file holding at least `metadata.yaml`, and
//! optionally `config.yaml`, `actions.yaml` and a `revision` file.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{RepoError, Result};

const METADATA_FILE: &str = "metadata.yaml";
const CONFIG_FILE: &str = "config.yaml";
const ACTIONS_FILE: &str = "actions.yaml";
const REVISION_FILE: &str = "revision";

/// Charm metadata from `metadata.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Meta {
    /// Charm name.
    pub name: String,
    /// One-line summary.
    pub summary: String,
    /// Long description.
    pub description: String,
    /// Whether the charm is deployed alongside a principal.
    pub subordinate: bool,
    /// Relations this charm provides.
    pub provides: BTreeMap<String, Relation>,
    /// Relations this charm requires.
    pub requires: BTreeMap<String, Relation>,
    /// Peer relations.
    pub peers: BTreeMap<String, Relation>,
    /// Store categories.
    pub categories: Vec<String>,
    /// Store tags.
    pub tags: Vec<String>,
    /// Series the charm supports, for multi-series charms.
    pub series: Vec<String>,
}

/// Relation scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationScope {
    /// Relates to every unit of the remote application.
    #[default]
    Global,
    /// Relates only to units in the same container.
    Container,
}

/// A relation endpoint.
///
/// `metadata.yaml` allows either `db: mysql` or the full mapping form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RelationSpec")]
pub struct Relation {
    /// Interface name.
    pub interface: String,
    /// Scope of the relation.
    pub scope: RelationScope,
    /// Maximum number of related applications, if limited.
    pub limit: Option<u32>,
    /// Whether the charm works without this relation.
    pub optional: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RelationSpec {
    Interface(String),
    Full {
        interface: String,
        #[serde(default)]
        scope: RelationScope,
        #[serde(default)]
        limit: Option<u32>,
        #[serde(default)]
        optional: bool,
    },
}

impl From<RelationSpec> for Relation {
    fn from(spec: RelationSpec) -> Self {
        match spec {
            RelationSpec::Interface(interface) => Self {
                interface,
                scope: RelationScope::Global,
                limit: None,
                optional: false,
            },
            RelationSpec::Full {
                interface,
                scope,
                limit,
                optional,
            } => Self {
                interface,
                scope,
                limit,
                optional,
            },
        }
    }
}

/// Charm configuration schema from `config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Options by name.
    pub options: BTreeMap<String, ConfigOption>,
}

/// Value type of a configuration option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// Free-form text.
    #[default]
    String,
    /// Integer.
    Int,
    /// Floating point.
    Float,
    /// `true` or `false`.
    Boolean,
}

/// One configuration option.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigOption {
    /// Value type.
    #[serde(rename = "type")]
    pub kind: OptionType,
    /// Human readable description.
    pub description: String,
    /// Default value, if any.
    pub default: Option<serde_yaml::Value>,
}

/// Actions from `actions.yaml`, by name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Actions(pub BTreeMap<String, ActionSpec>);

/// One action.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ActionSpec {
    /// Human readable description.
    pub description: String,
    /// Parameter schema, left uninterpreted.
    pub params: BTreeMap<String, serde_yaml::Value>,
}

/// A charm archive on disk, parsed.
///
/// The file itself stays where it is (usually in the cache); this only
/// holds what was read from it.
#[derive(Debug, Clone, PartialEq)]
pub struct CharmArchive {
    path: PathBuf,
    meta: Meta,
    config: Config,
    actions: Actions,
    revision: Option<u32>,
}

impl CharmArchive {
    /// Open and parse the archive at `path`.
    ///
    /// # Errors
    ///
    /// [`RepoError::InvalidArchive`] if the file is not a zip, lacks
    /// `metadata.yaml`, or holds malformed YAML.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let invalid = |detail: String| RepoError::InvalidArchive {
            path: path.to_path_buf(),
            detail,
        };

        let file = File::open(path).map_err(|e| invalid(e.to_string()))?;
        let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|e| invalid(e.to_string()))?;

        let meta: Meta = match read_entry(&mut zip, METADATA_FILE).map_err(&invalid)? {
            Some(text) => parse_yaml(&text, METADATA_FILE).map_err(&invalid)?,
            None => return Err(invalid(format!("missing {METADATA_FILE}"))),
        };
        if meta.name.is_empty() {
            return Err(invalid(format!("{METADATA_FILE}: charm name is empty")));
        }

        let config = match read_entry(&mut zip, CONFIG_FILE).map_err(&invalid)? {
            Some(text) => parse_yaml(&text, CONFIG_FILE).map_err(&invalid)?,
            None => Config::default(),
        };
        let actions = match read_entry(&mut zip, ACTIONS_FILE).map_err(&invalid)? {
            Some(text) => parse_yaml(&text, ACTIONS_FILE).map_err(&invalid)?,
            None => Actions::default(),
        };
        let revision = match read_entry(&mut zip, REVISION_FILE).map_err(&invalid)? {
            Some(text) => Some(
                text.trim()
                    .parse::<u32>()
                    .map_err(|e| invalid(format!("{REVISION_FILE}: {e}")))?,
            ),
            None => None,
        };

        Ok(Self {
            path: path.to_path_buf(),
            meta,
            config,
            actions,
            revision,
        })
    }

    /// Path of the backing archive file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed `metadata.yaml`.
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Parsed `config.yaml`, empty when absent.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parsed `actions.yaml`, empty when absent.
    pub fn actions(&self) -> &Actions {
        &self.actions
    }

    /// Content of the `revision` file, when present.
    pub fn revision(&self) -> Option<u32> {
        self.revision
    }
}

fn read_entry<R: Read + std::io::Seek>(
    zip: &mut ZipArchive<R>,
    name: &str,
) -> std::result::Result<Option<String>, String> {
    let mut entry = match zip.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(format!("{name}: {e}")),
    };
    let mut text = String::new();
    entry
        .read_to_string(&mut text)
        .map_err(|e| format!("{name}: {e}"))?;
    Ok(Some(text))
}

fn parse_yaml<T: DeserializeOwned + Default>(
    text: &str,
    name: &str,
) -> std::result::Result<T, String> {
    // An empty document is valid and means "nothing declared".
    if text.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(text).map_err(|e| format!("{name}: {e}"))
}
