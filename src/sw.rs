//! Browser service-worker generation for the web dashboard.
//!
//! The emitted script applies the same policy as [`crate::cache::OfflineCache`].

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::cache::CacheSettings;
use crate::error::CacheError;

pub const FILE_NAME: &str = "service-worker.js";

/// Render `service-worker.js` for `settings`.
pub fn render_service_worker(settings: &CacheSettings) -> String {
    let assets = settings
        .assets
        .iter()
        .map(|a| format!("  {}", js_string(a)))
        .collect::<Vec<_>>()
        .join(",\n");

    let mut js = String::new();
    let _ = writeln!(js, "const CACHE_NAME = {};", js_string(&settings.name));
    let _ = writeln!(js, "const FALLBACK_URL = {};", js_string(&settings.fallback));
    let _ = writeln!(js, "const urlsToCache = [\n{}\n];", assets);
    js.push_str(BODY);
    js
}

/// Write the rendered script into `dir`, creating it if needed.
pub fn write_service_worker(settings: &CacheSettings, dir: &Path) -> Result<PathBuf, CacheError> {
    std::fs::create_dir_all(dir).map_err(|e| CacheError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let path = dir.join(FILE_NAME);
    std::fs::write(&path, render_service_worker(settings)).map_err(|e| CacheError::Io {
        path: path.clone(),
        source: e,
    })?;
    tracing::info!(path = %path.display(), "service worker written");
    Ok(path)
}

/// A JSON string is a valid JS literal. `<` is escaped as well so the value
/// can never close an inline `<script>`.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_owned())
        .to_string()
        .replace('<', "\\u003c")
}

const BODY: &str = r#"
self.addEventListener('install', (event) => {
  event.waitUntil(
    caches.open(CACHE_NAME).then((cache) =>
      Promise.all(
        urlsToCache.map((url) => cache.add(url).catch(() => undefined))
      )
    )
  );
  self.skipWaiting();
});

self.addEventListener('activate', (event) => {
  event.waitUntil(
    caches.keys().then((cacheNames) =>
      Promise.all(
        cacheNames
          .filter((cacheName) => cacheName !== CACHE_NAME)
          .map((cacheName) => caches.delete(cacheName))
      )
    )
  );
  self.clients.claim();
});

self.addEventListener('fetch', (event) => {
  const url = new URL(event.request.url);
  if (event.request.method !== 'GET' || url.pathname === '/api' || url.pathname.startsWith('/api/')) {
    return;
  }

  event.respondWith(
    caches.open(CACHE_NAME).then((cache) =>
      cache.match(event.request).then((cached) => {
        if (cached) {
          return cached;
        }
        return fetch(event.request).then((response) => {
          if (!response || response.status !== 200 || response.type === 'error') {
            return response;
          }
          cache.put(event.request, response.clone());
          return response;
        });
      })
    ).catch(() => caches.match(FALLBACK_URL))
  );
});
"#;
