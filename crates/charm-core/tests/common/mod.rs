//! Shared fixtures: an in-process fake charm store and test charm archives.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;

use charm_core::client::{CONTENT_HASH_HEADER, ENTITY_ID_HEADER};
use charm_core::{CharmStore, CharmStoreParams};
use charm_schema::{CharmUrl, Sha256Hash, Sha384Hash};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use zip::write::SimpleFileOptions;

/// An entity revision published to the fake store.
#[derive(Debug, Clone)]
pub struct Published {
    pub url: CharmUrl,
    pub data: Vec<u8>,
    pub hash: Sha384Hash,
    pub sha256: Sha256Hash,
}

/// Charm store double serving the v4 meta and archive endpoints.
///
/// Every mock is registered on an exact path so no two mocks ever match the
/// same request.
pub struct FakeStore {
    server: ServerGuard,
    test_mode_only: bool,
    revisions: HashMap<String, u32>,
    latest: HashMap<String, Published>,
    latest_mock: Option<Mock>,
    meta: HashMap<String, Mock>,
    archives: HashMap<String, Mock>,
}

impl FakeStore {
    pub async fn new() -> Self {
        Self {
            server: Server::new_async().await,
            test_mode_only: false,
            revisions: HashMap::new(),
            latest: HashMap::new(),
            latest_mock: None,
            meta: HashMap::new(),
            archives: HashMap::new(),
        }
    }

    /// A store whose archive endpoint only answers uncounted (`stats=0`) requests.
    pub async fn test_mode_only() -> Self {
        Self {
            test_mode_only: true,
            ..Self::new().await
        }
    }

    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Repository pointed at this store, caching under `cache_dir`.
    pub fn repo(&self, cache_dir: &Path) -> CharmStore {
        CharmStore::new(CharmStoreParams {
            url: Some(self.url()),
            cache_dir: Some(cache_dir.to_path_buf()),
            ..Default::default()
        })
    }

    /// Publish the next revision of `entity` (e.g. `~who/trusty/mysql`) built
    /// from the named fixture charm.
    pub async fn add_charm(&mut self, entity: &str, fixture: &str) -> Published {
        let revision = self.next_revision(entity);
        let data = charm_archive(fixture, revision);
        self.publish(entity, revision, data).await
    }

    /// Publish the next revision of a bundle (e.g. `~who/bundle/django`).
    pub async fn add_bundle(&mut self, entity: &str) -> Published {
        let revision = self.next_revision(entity);
        let data = zip_files(&[("bundle.yaml", "services: {}\n")]);
        self.publish(entity, revision, data).await
    }

    /// Answer metadata requests for `path` with a not-found error.
    pub async fn not_found(&mut self, path: &str) {
        let mock = self
            .server
            .mock("GET", format!("/v4/{path}/meta/any").as_str())
            .match_query(Matcher::Any)
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Message": "no matching charm or bundle", "Code": "not found"}"#)
            .create_async()
            .await;
        self.replace_meta(path, mock).await;
    }

    /// Expect exactly `hits` downloads of `url` from now on.
    pub async fn expect_archive_downloads(&mut self, published: &Published, hits: usize) {
        self.serve_archive(published, published.hash.as_str(), Some(hits))
            .await;
    }

    /// Serve `published` with a `Content-Sha384` header that does not match it.
    pub async fn serve_wrong_hash(&mut self, published: &Published) {
        self.serve_archive(published, "invalid", None).await;
    }

    /// Assert the expectation set by [`Self::expect_archive_downloads`].
    pub async fn assert_archive_downloads(&self, url: &CharmUrl) {
        self.archives[&url.to_string()].assert_async().await;
    }

    /// Report `count` from the download counter of `url`.
    pub async fn set_download_count(&mut self, url: &CharmUrl, count: i64) -> Mock {
        let key = format!(
            "archive-download:{}:{}:{}:{}",
            url.series(),
            url.name(),
            url.user().unwrap_or_default(),
            url.revision()
        );
        self.server
            .mock("GET", format!("/v4/stats/counter/{key}").as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!([{ "Count": count }]).to_string())
            .create_async()
            .await
    }

    fn next_revision(&mut self, entity: &str) -> u32 {
        let revision = self.revisions.get(entity).map_or(0, |r| r + 1);
        self.revisions.insert(entity.to_string(), revision);
        revision
    }

    async fn publish(&mut self, entity: &str, revision: u32, data: Vec<u8>) -> Published {
        let url: CharmUrl = format!("cs:{entity}-{revision}").parse().unwrap();
        let published = Published {
            hash: Sha384Hash::compute(&data),
            sha256: Sha256Hash::compute(&data),
            url,
            data,
        };

        let short = seriesless(&published.url);
        for path in [
            published.url.path(),
            format!("{short}-{revision}"),
            entity.to_string(),
            short.clone(),
        ] {
            self.serve_meta(&path, &published).await;
        }
        self.serve_archive(&published, published.hash.as_str(), None)
            .await;

        self.latest.insert(entity.to_string(), published.clone());
        self.latest.insert(short, published.clone());
        self.refresh_latest().await;

        published
    }

    async fn serve_meta(&mut self, path: &str, published: &Published) {
        let body = json!({
            "Id": published.url.to_string(),
            "Meta": { "hash": { "Sum": published.hash.as_str() } },
        });
        let mock = self
            .server
            .mock("GET", format!("/v4/{path}/meta/any").as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;
        self.replace_meta(path, mock).await;
    }

    async fn replace_meta(&mut self, path: &str, mock: Mock) {
        if let Some(old) = self.meta.insert(path.to_string(), mock) {
            old.remove_async().await;
        }
    }

    async fn serve_archive(&mut self, published: &Published, hash: &str, hits: Option<usize>) {
        let key = published.url.to_string();
        if let Some(old) = self.archives.remove(&key) {
            old.remove_async().await;
        }

        let query = if self.test_mode_only {
            Matcher::UrlEncoded("stats".into(), "0".into())
        } else {
            Matcher::Any
        };
        let mut mock = self
            .server
            .mock("GET", format!("/v4/{}/archive", published.url.path()).as_str())
            .match_query(query)
            .with_status(200)
            .with_header(ENTITY_ID_HEADER, key.as_str())
            .with_header(CONTENT_HASH_HEADER, hash)
            .with_body(&published.data);
        if let Some(hits) = hits {
            mock = mock.expect(hits);
        }
        self.archives.insert(key, mock.create_async().await);
    }

    async fn refresh_latest(&mut self) {
        if let Some(old) = self.latest_mock.take() {
            old.remove_async().await;
        }
        let body: serde_json::Map<String, serde_json::Value> = self
            .latest
            .iter()
            .map(|(id, p)| {
                (
                    id.clone(),
                    json!({
                        "Meta": {
                            "id-revision": { "Revision": p.url.revision() },
                            "hash256": { "Sum": p.sha256.as_str() },
                        }
                    }),
                )
            })
            .collect();
        let mock = self
            .server
            .mock("GET", "/v4/meta/any")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::Value::Object(body).to_string())
            .create_async()
            .await;
        self.latest_mock = Some(mock);
    }
}

/// `~who/trusty/mysql-3` -> `~who/mysql`.
fn seriesless(url: &CharmUrl) -> String {
    match url.user() {
        Some(user) => format!("~{user}/{}", url.name()),
        None => url.name().to_string(),
    }
}

/// Zip archive for one of the fixture charms.
pub fn charm_archive(fixture: &str, revision: u32) -> Vec<u8> {
    let metadata = match fixture {
        "mysql" => {
            "name: mysql\nsummary: Database engine\ndescription: A pretty popular database\nprovides:\n  server: mysql\n"
        }
        "wordpress" => {
            "name: wordpress\nsummary: Blog engine\ndescription: A pretty popular blog engine\nprovides:\n  url:\n    interface: http\n    limit: 1\nrequires:\n  db:\n    interface: mysql\n    limit: 1\n"
        }
        "riak" => {
            "name: riak\nsummary: K/V storage engine\ndescription: Scalable K/V Store in Erlang\nprovides:\n  endpoint: http\npeers:\n  ring: riak\n"
        }
        "logging" => {
            "name: logging\nsummary: Subordinate logging test charm\ndescription: This is a longer description.\nsubordinate: true\nrequires:\n  logging-directory:\n    interface: logging\n    scope: container\n"
        }
        other => panic!("unknown fixture charm {other}"),
    };
    let config = "options:\n  title:\n    type: string\n    default: My Title\n    description: A descriptive title\n";
    let revision = revision.to_string();
    zip_files(&[
        ("metadata.yaml", metadata),
        ("config.yaml", config),
        ("revision", revision.as_str()),
    ])
}

fn zip_files(files: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().last_modified_time(zip::DateTime::default());
    for (name, content) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}
