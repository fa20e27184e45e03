//! HTTP client for the charm store v4 API.
//!
//! Covers the four endpoints the repository needs: reference resolution,
//! batch revision lookup, archive download and the download counter.

use std::collections::HashMap;
use std::fmt;

use bytes::{Bytes, BytesMut};
use charm_schema::{
    CharmUrl, EntityKind, Reference, ReferenceError, Schema, Sha256Hash, Sha384Hash,
};
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{CharmNotFound, RepoError, Result};
use crate::integrity::Verifier;
use crate::paths::DEFAULT_STORE_URL;

/// API version path segment.
pub const API_VERSION: &str = "v4";

/// Response header carrying the resolved URL of a downloaded archive.
pub const ENTITY_ID_HEADER: &str = "Entity-Id";

/// Response header carrying the SHA-384 of a downloaded archive.
pub const CONTENT_HASH_HEADER: &str = "Content-Sha384";

/// Stats counter prefix incremented on every counted archive download.
pub const STATS_ARCHIVE_DOWNLOAD: &str = "archive-download";

const NOT_FOUND_CODE: &str = "not found";

const META_CONTEXT: &str = "cannot get metadata";
const BATCH_CONTEXT: &str = "cannot get metadata from the charm store";
const ARCHIVE_CONTEXT: &str = "cannot get archive";
const STATS_CONTEXT: &str = "cannot get download count";

/// Basic-auth credentials passed through to the store unmodified.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Result of resolving a reference against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCharm {
    /// Fully-qualified URL the reference resolved to.
    pub url: CharmUrl,
    /// Declared SHA-384 of the archive behind `url`.
    pub hash: Sha384Hash,
}

/// Latest revision of an entity, as reported by the batch lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharmRevision {
    /// Latest published revision.
    pub revision: u32,
    /// SHA-256 of that revision's archive.
    pub sha256: Sha256Hash,
}

/// Per-item outcome of a batch revision lookup.
pub type RevisionResult = std::result::Result<CharmRevision, CharmNotFound>;

/// Archive bytes with the identity and hash the store declared for them.
///
/// The bytes have already been checked against `hash`.
#[derive(Debug, Clone)]
pub struct Archive {
    /// URL from the `Entity-Id` header (or the requested URL when absent).
    pub url: CharmUrl,
    /// Hash from the `Content-Sha384` header.
    pub hash: Sha384Hash,
    /// Raw archive content.
    pub data: Bytes,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResolveResponse {
    id: String,
    meta: ResolveMeta,
}

#[derive(Deserialize)]
struct ResolveMeta {
    hash: HashSum,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HashSum {
    sum: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BatchEntry {
    meta: BatchMeta,
}

#[derive(Deserialize)]
struct BatchMeta {
    #[serde(rename = "id-revision")]
    id_revision: IdRevision,
    hash256: HashSum,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IdRevision {
    revision: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Counter {
    count: i64,
}

/// Client for a charm store instance.
#[derive(Debug, Clone)]
pub struct CharmStoreClient {
    http: Client,
    base_url: String,
    credentials: Option<Credentials>,
    test_mode: bool,
}

impl Default for CharmStoreClient {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_URL)
    }
}

impl CharmStoreClient {
    /// Client for the store at `base_url` (without the API version segment).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Client reusing an existing HTTP client.
    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
            test_mode: false,
        }
    }

    /// Attach basic-auth credentials to every request.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            user: user.into(),
            password: password.into(),
        });
        self
    }

    /// In test mode archive downloads do not bump the store's download counter.
    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    /// Base URL of the store.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether download counting is suppressed.
    pub fn is_test_mode(&self) -> bool {
        self.test_mode
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{API_VERSION}/{path}", self.base_url)
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let req = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT);
        match &self.credentials {
            Some(c) => req.basic_auth(&c.user, Some(&c.password)),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder, context: &'static str, subject: &str) -> Result<Response> {
        let resp = req.send().await?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(error_from_response(resp, context, subject).await)
        }
    }

    /// Resolve a possibly partial reference to a fully-qualified URL and its
    /// declared archive hash.
    ///
    /// Bundles resolve like charms; callers decide which kinds they accept.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] when the store has no match, [`RepoError::Remote`]
    /// for other store errors, [`RepoError::Transport`] on network failure.
    pub async fn resolve(&self, reference: &Reference) -> Result<ResolvedCharm> {
        let path = store_path(reference)?;
        let req = self
            .get(&self.endpoint(&format!("{path}/meta/any")))
            .query(&[("include", "id"), ("include", "hash")]);
        let resp = self.send(req, META_CONTEXT, &reference.to_string()).await?;
        let body: ResolveResponse = decode(resp, META_CONTEXT).await?;

        let url = body.id.parse::<CharmUrl>().map_err(|e| RepoError::InvalidResponse {
            context: META_CONTEXT,
            detail: e.to_string(),
        })?;
        tracing::debug!("Resolved {} to {}", reference, url);
        Ok(ResolvedCharm {
            url,
            hash: Sha384Hash::new(body.meta.hash.sum),
        })
    }

    /// Latest revision and SHA-256 for each reference, in one round trip.
    ///
    /// Results line up with `references`, duplicates included. Entities the
    /// store does not know, and references it cannot serve (`local:`), come
    /// back as per-item [`CharmNotFound`] naming the revision-less reference.
    ///
    /// # Errors
    ///
    /// Fails as a whole only when the request itself fails.
    pub async fn latest(&self, references: &[Reference]) -> Result<Vec<RevisionResult>> {
        if references.is_empty() {
            return Ok(Vec::new());
        }

        // References the store cannot serve are reported per item.
        let ids: Vec<Option<String>> = references
            .iter()
            .map(|r| store_path(&r.without_revision()).ok())
            .collect();
        let queried: Vec<&str> = ids.iter().flatten().map(String::as_str).collect();

        let entries: HashMap<String, BatchEntry> = if queried.is_empty() {
            HashMap::new()
        } else {
            let mut query = vec![
                ("ignore-auth", "1"),
                ("include", "id-revision"),
                ("include", "hash256"),
            ];
            query.extend(queried.iter().map(|id| ("id", *id)));

            let req = self.get(&self.endpoint("meta/any")).query(&query);
            let resp = self.send(req, BATCH_CONTEXT, &queried.join(", ")).await?;
            decode(resp, BATCH_CONTEXT).await?
        };

        Ok(references
            .iter()
            .zip(&ids)
            .map(|(reference, id)| {
                match id.as_ref().and_then(|id| entries.get(id)) {
                    Some(entry) => Ok(CharmRevision {
                        revision: entry.meta.id_revision.revision,
                        sha256: Sha256Hash::new(entry.meta.hash256.sum.as_str()),
                    }),
                    None => Err(CharmNotFound::new(reference.without_revision())),
                }
            })
            .collect())
    }

    /// Download the archive for `url`, which must denote an entity of kind
    /// `expected`.
    ///
    /// # Errors
    ///
    /// [`RepoError::WrongEntityKind`] when the `Entity-Id` header names the
    /// other kind (checked before the body is read), [`RepoError::Remote`] with
    /// the store's message verbatim, [`RepoError::InvalidResponse`] when the
    /// hash header is missing, [`RepoError::HashMismatch`] when the streamed
    /// body does not hash to the declared value.
    pub async fn fetch_archive(&self, url: &CharmUrl, expected: EntityKind) -> Result<Archive> {
        let mut req = self.get(&self.endpoint(&format!("{}/archive", url.path())));
        if self.test_mode {
            req = req.query(&[("stats", "0")]);
        }
        let resp = self.send(req, ARCHIVE_CONTEXT, &url.to_string()).await?;

        let entity = match header(&resp, ENTITY_ID_HEADER) {
            Some(id) => id.parse::<CharmUrl>().map_err(|e| RepoError::InvalidResponse {
                context: ARCHIVE_CONTEXT,
                detail: format!("bad {ENTITY_ID_HEADER} header: {e}"),
            })?,
            None => url.clone(),
        };
        if entity.kind() != expected {
            return Err(RepoError::WrongEntityKind {
                expected,
                actual: entity.kind(),
                url: entity.to_string(),
            });
        }

        let hash = header(&resp, CONTENT_HASH_HEADER)
            .map(Sha384Hash::new)
            .ok_or_else(|| RepoError::InvalidResponse {
                context: ARCHIVE_CONTEXT,
                detail: format!("missing {CONTENT_HASH_HEADER} header"),
            })?;

        let mut verifier = Verifier::new(hash.clone());
        let mut data = BytesMut::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            verifier.update(&chunk);
            data.extend_from_slice(&chunk);
        }
        verifier.finish()?;

        tracing::debug!("Fetched {} ({} bytes)", entity, data.len());
        if self.test_mode {
            tracing::debug!("Download of {} not counted (test mode)", entity);
        }
        Ok(Archive {
            url: entity,
            hash,
            data: data.freeze(),
        })
    }

    /// Current value of the archive download counter for `url`.
    ///
    /// The counter is updated asynchronously by the store, so a download may
    /// take a moment to show up here.
    pub async fn download_count(&self, url: &CharmUrl) -> Result<i64> {
        let key = format!(
            "{STATS_ARCHIVE_DOWNLOAD}:{}:{}:{}:{}",
            url.series(),
            url.name(),
            url.user().unwrap_or_default(),
            url.revision()
        );
        let req = self.get(&self.endpoint(&format!("stats/counter/{key}")));
        let resp = self.send(req, STATS_CONTEXT, &url.to_string()).await?;
        let counters: Vec<Counter> = decode(resp, STATS_CONTEXT).await?;
        Ok(counters.first().map_or(0, |c| c.count))
    }
}

/// Wire path for a reference. Only `cs:` references can be served.
fn store_path(reference: &Reference) -> Result<String> {
    if reference.schema() != Schema::CharmStore {
        return Err(ReferenceError::InvalidSchema(reference.to_string()).into());
    }
    Ok(reference.path())
}

fn header(resp: &Response, name: &str) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn decode<T: DeserializeOwned>(resp: Response, context: &'static str) -> Result<T> {
    let body = resp.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| RepoError::InvalidResponse {
        context,
        detail: e.to_string(),
    })
}

async fn error_from_response(resp: Response, context: &'static str, subject: &str) -> RepoError {
    let status = resp.status();
    let body = match resp.bytes().await {
        Ok(body) => body,
        Err(e) => return e.into(),
    };
    match serde_json::from_slice::<ErrorBody>(&body) {
        Ok(err) if err.code.as_deref() == Some(NOT_FOUND_CODE) => CharmNotFound::new(subject).into(),
        Ok(err) => RepoError::Remote {
            context,
            message: err.message,
            code: err.code,
        },
        Err(_) if status == StatusCode::NOT_FOUND => CharmNotFound::new(subject).into(),
        Err(_) => RepoError::Remote {
            context,
            message: format!("unexpected status {status}"),
            code: None,
        },
    }
}
