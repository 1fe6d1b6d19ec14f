//! Cache-first static asset cache with a network fallback.
//!
//! Mirrors the dashboard's browser service worker: a versioned cache is
//! pre-populated on install, stale versions are evicted on activate, and GET
//! requests for non-API paths are served from cache before the network.

mod storage;

use async_trait::async_trait;
use reqwest::{Method, Url};
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::error::CacheError;

pub use storage::{CacheStorage, CachedResponse};

/// How the network layer classified a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseKind {
    Basic,
    Opaque,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkResponse {
    pub status: u16,
    pub kind: ResponseKind,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl NetworkResponse {
    /// Only complete, successful responses are worth keeping.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.kind != ResponseKind::Error
    }

    fn to_cached(&self) -> CachedResponse {
        CachedResponse {
            status: self.status,
            content_type: self.content_type.clone(),
            body: self.body.clone(),
        }
    }
}

/// Where the asset cache gets responses it does not hold.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, method: &Method, path: &str) -> Result<NetworkResponse, CacheError>;
}

/// `Network` backed by the dashboard's origin over HTTP.
pub struct HttpNetwork {
    client: reqwest::Client,
    origin: Url,
}

impl HttpNetwork {
    pub fn new(origin: &str) -> Result<Self, CacheError> {
        let mut origin = Url::parse(origin).map_err(|e| CacheError::Network {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;
        if !origin.path().ends_with('/') {
            let path = format!("{}/", origin.path());
            origin.set_path(&path);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            origin,
        })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, method: &Method, path: &str) -> Result<NetworkResponse, CacheError> {
        let network_err = |reason: String| CacheError::Network {
            path: path.to_string(),
            reason,
        };
        let url = self
            .origin
            .join(path.trim_start_matches('/'))
            .map_err(|e| network_err(e.to_string()))?;

        debug!(%method, %url, "asset fetch");
        let response = self
            .client
            .request(method.clone(), url)
            .send()
            .await
            .map_err(|e| network_err(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| network_err(e.to_string()))?
            .to_vec();

        Ok(NetworkResponse {
            status,
            kind: ResponseKind::Basic,
            content_type,
            body,
        })
    }
}

/// Name, precache list and offline fallback of one cache version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheSettings {
    pub name: String,
    pub assets: Vec<String>,
    pub fallback: String,
}

impl From<&CacheConfig> for CacheSettings {
    fn from(config: &CacheConfig) -> Self {
        Self {
            name: config.name.clone(),
            assets: config.assets.clone(),
            fallback: config.fallback.clone(),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub cached: Vec<String>,
    /// Assets left out, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// Result of `OfflineCache::fetch`, tagged by where it came from.
#[derive(Debug, PartialEq, Eq)]
pub enum Served {
    Cache(CachedResponse),
    Network(NetworkResponse),
    /// The fallback document, served because the network was unreachable.
    Fallback(CachedResponse),
    /// Non-GET or API request, passed straight to the network.
    Bypass(NetworkResponse),
}

impl Served {
    pub fn status(&self) -> u16 {
        match self {
            Served::Cache(r) | Served::Fallback(r) => r.status,
            Served::Network(r) | Served::Bypass(r) => r.status,
        }
    }

    pub fn body(&self) -> &[u8] {
        match self {
            Served::Cache(r) | Served::Fallback(r) => &r.body,
            Served::Network(r) | Served::Bypass(r) => &r.body,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            Served::Cache(_) => "cache",
            Served::Network(_) => "network",
            Served::Fallback(_) => "fallback",
            Served::Bypass(_) => "bypass",
        }
    }
}

pub fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

pub struct OfflineCache<N> {
    settings: CacheSettings,
    storage: CacheStorage,
    network: N,
}

impl<N: Network> OfflineCache<N> {
    pub fn new(settings: CacheSettings, storage: CacheStorage, network: N) -> Self {
        Self {
            settings,
            storage,
            network,
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    /// Pre-populate the current cache. A missing asset never fails the install.
    pub async fn install(&self) -> Result<InstallReport, CacheError> {
        let mut report = InstallReport::default();

        for asset in &self.settings.assets {
            match self.network.fetch(&Method::GET, asset).await {
                Ok(response) if response.is_cacheable() => {
                    self.storage.put(&self.settings.name, asset, &response.to_cached())?;
                    report.cached.push(asset.clone());
                }
                Ok(response) => {
                    report
                        .skipped
                        .push((asset.clone(), format!("HTTP {}", response.status)));
                }
                Err(e) => report.skipped.push((asset.clone(), e.to_string())),
            }
        }

        info!(
            cache = %self.settings.name,
            cached = report.cached.len(),
            skipped = report.skipped.len(),
            "cache installed"
        );
        Ok(report)
    }

    /// Delete every cache except the current one. Returns the deleted names.
    pub fn activate(&self) -> Result<Vec<String>, CacheError> {
        let mut deleted = Vec::new();
        for name in self.storage.names()? {
            if name != self.settings.name && self.storage.delete(&name)? {
                deleted.push(name);
            }
        }
        if !deleted.is_empty() {
            info!(?deleted, "evicted stale caches");
        }
        Ok(deleted)
    }

    pub async fn fetch(&self, method: &Method, path: &str) -> Result<Served, CacheError> {
        if *method != Method::GET || is_api_path(path) {
            return self.network.fetch(method, path).await.map(Served::Bypass);
        }

        match self.storage.get(&self.settings.name, path) {
            Ok(Some(hit)) => return Ok(Served::Cache(hit)),
            Ok(None) => {}
            Err(e) => warn!(path, "cache lookup failed: {}", e),
        }

        match self.network.fetch(method, path).await {
            Ok(response) => {
                if response.is_cacheable() {
                    if let Err(e) = self.storage.put(&self.settings.name, path, &response.to_cached()) {
                        warn!(path, "cache store failed: {}", e);
                    }
                }
                Ok(Served::Network(response))
            }
            Err(e) => {
                warn!(path, "network unreachable, trying fallback: {}", e);
                match self.storage.get(&self.settings.name, &self.settings.fallback) {
                    Ok(Some(doc)) => Ok(Served::Fallback(doc)),
                    _ => Err(CacheError::Offline {
                        path: path.to_string(),
                    }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves fixed pages; anything else is a connection failure.
    #[derive(Default)]
    struct FakeNetwork {
        pages: HashMap<String, NetworkResponse>,
        offline: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeNetwork {
        fn with_page(mut self, path: &str, status: u16, kind: ResponseKind, body: &str) -> Self {
            self.pages.insert(
                path.to_string(),
                NetworkResponse {
                    status,
                    kind,
                    content_type: Some("text/html".into()),
                    body: body.as_bytes().to_vec(),
                },
            );
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Network for FakeNetwork {
        async fn fetch(&self, method: &Method, path: &str) -> Result<NetworkResponse, CacheError> {
            self.calls.lock().unwrap().push(format!("{} {}", method, path));
            if self.offline {
                return Err(CacheError::Network {
                    path: path.to_string(),
                    reason: "connection refused".into(),
                });
            }
            self.pages.get(path).cloned().ok_or_else(|| CacheError::Network {
                path: path.to_string(),
                reason: "no route".into(),
            })
        }
    }

    fn settings() -> CacheSettings {
        CacheSettings::from(&CacheConfig::default())
    }

    fn cache(dir: &tempfile::TempDir, network: FakeNetwork) -> OfflineCache<FakeNetwork> {
        OfflineCache::new(settings(), CacheStorage::new(dir.path()), network)
    }

    fn page(body: &str) -> CachedResponse {
        CachedResponse {
            status: 200,
            content_type: Some("text/html".into()),
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn cached_get_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir, FakeNetwork::default());
        cache.storage().put(&settings().name, "/app.js", &page("js")).unwrap();

        let served = cache.fetch(&Method::GET, "/app.js").await.unwrap();
        assert_eq!(served, Served::Cache(page("js")));
        assert!(cache.network.calls().is_empty());
    }

    #[tokio::test]
    async fn miss_is_fetched_and_stored() {
        let dir = tempfile::tempdir().unwrap();
        let network = FakeNetwork::default().with_page("/app.js", 200, ResponseKind::Basic, "js");
        let cache = cache(&dir, network);

        let served = cache.fetch(&Method::GET, "/app.js").await.unwrap();
        assert_eq!(served.source(), "network");
        assert_eq!(served.body(), b"js");
        assert_eq!(cache.storage().get(&settings().name, "/app.js").unwrap(), Some(page("js")));

        // second request is a hit
        let again = cache.fetch(&Method::GET, "/app.js").await.unwrap();
        assert_eq!(again.source(), "cache");
        assert_eq!(cache.network.calls().len(), 1);
    }

    #[tokio::test]
    async fn non_200_and_error_responses_are_not_stored() {
        let dir = tempfile::tempdir().unwrap();
        let network = FakeNetwork::default()
            .with_page("/missing", 404, ResponseKind::Basic, "nope")
            .with_page("/broken", 200, ResponseKind::Error, "");
        let cache = cache(&dir, network);

        let served = cache.fetch(&Method::GET, "/missing").await.unwrap();
        assert_eq!(served.status(), 404);
        cache.fetch(&Method::GET, "/broken").await.unwrap();
        assert!(cache.storage().keys(&settings().name).unwrap().is_empty());
    }

    #[tokio::test]
    async fn offline_miss_serves_fallback_document() {
        let dir = tempfile::tempdir().unwrap();
        let network = FakeNetwork {
            offline: true,
            ..Default::default()
        };
        let cache = cache(&dir, network);
        cache.storage().put(&settings().name, "/index.html", &page("<html>app</html>")).unwrap();

        let served = cache.fetch(&Method::GET, "/settings").await.unwrap();
        assert_eq!(served, Served::Fallback(page("<html>app</html>")));
    }

    #[tokio::test]
    async fn offline_without_fallback_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let network = FakeNetwork {
            offline: true,
            ..Default::default()
        };
        let cache = cache(&dir, network);

        let err = cache.fetch(&Method::GET, "/settings").await.unwrap_err();
        assert!(matches!(err, CacheError::Offline { path } if path == "/settings"));
    }

    #[tokio::test]
    async fn api_and_non_get_requests_bypass() {
        let dir = tempfile::tempdir().unwrap();
        let network = FakeNetwork::default()
            .with_page("/api/services", 200, ResponseKind::Basic, "{}")
            .with_page("/form", 200, ResponseKind::Basic, "ok");
        let cache = cache(&dir, network);

        assert_eq!(cache.fetch(&Method::GET, "/api/services").await.unwrap().source(), "bypass");
        assert_eq!(cache.fetch(&Method::POST, "/form").await.unwrap().source(), "bypass");
        assert_eq!(cache.fetch(&Method::GET, "/api/services").await.unwrap().source(), "bypass");
        assert!(cache.storage().keys(&settings().name).unwrap().is_empty());
        assert_eq!(cache.network.calls().len(), 3);
    }

    #[tokio::test]
    async fn install_skips_missing_assets() {
        let dir = tempfile::tempdir().unwrap();
        let network = FakeNetwork::default()
            .with_page("/", 200, ResponseKind::Basic, "root")
            .with_page("/index.html", 200, ResponseKind::Basic, "index")
            .with_page("/manifest.json", 404, ResponseKind::Basic, "");
        let cache = cache(&dir, network);

        let report = cache.install().await.unwrap();
        assert_eq!(report.cached, vec!["/", "/index.html"]);
        let skipped: Vec<&str> = report.skipped.iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(skipped, vec!["/favicon.ico", "/manifest.json"]);
    }

    #[tokio::test]
    async fn activate_evicts_other_versions() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir, FakeNetwork::default());
        let storage = cache.storage();
        storage.put("home-server-manager-v0", "/", &page("old")).unwrap();
        storage.put("other-app", "/", &page("x")).unwrap();
        storage.put(&settings().name, "/", &page("new")).unwrap();

        let deleted = cache.activate().unwrap();
        assert_eq!(deleted, vec!["home-server-manager-v0", "other-app"]);
        assert_eq!(storage.names().unwrap(), vec![settings().name]);
    }

    #[test]
    fn api_path_detection() {
        assert!(is_api_path("/api/services"));
        assert!(is_api_path("/api"));
        assert!(!is_api_path("/apidocs"));
        assert!(!is_api_path("/index.html"));
    }
}
