use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

type Result<T> = std::result::Result<T, CacheError>;

const INDEX_FILE: &str = "index.json";

/// A stored response body with the metadata needed to replay it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Index {
    next_id: u64,
    entries: BTreeMap<String, EntryMeta>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    file: String,
    status: u16,
    content_type: Option<String>,
}

/// Named caches on disk: `<root>/<name>/index.json` plus one body file per entry.
pub struct CacheStorage {
    root: PathBuf,
}

impl CacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of every cache present on disk, sorted.
    pub fn names(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(&self.root, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&self.root, e))?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove a whole cache. Returns false if it did not exist.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let dir = self.dir(name)?;
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_err(&dir, e)),
        }
    }

    /// Cached request keys of one cache.
    pub fn keys(&self, name: &str) -> Result<Vec<String>> {
        let dir = self.dir(name)?;
        Ok(load_index(&dir)?.entries.into_keys().collect())
    }

    pub fn get(&self, name: &str, key: &str) -> Result<Option<CachedResponse>> {
        let dir = self.dir(name)?;
        let index = load_index(&dir)?;
        let Some(meta) = index.entries.get(key) else { return Ok(None) };

        let path = dir.join(&meta.file);
        let body = match std::fs::read(&path) {
            Ok(body) => body,
            // index entry without a body: treat as a miss
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path, e)),
        };

        Ok(Some(CachedResponse {
            status: meta.status,
            content_type: meta.content_type.clone(),
            body,
        }))
    }

    /// Store `response` under `key`, replacing any previous entry.
    pub fn put(&self, name: &str, key: &str, response: &CachedResponse) -> Result<()> {
        let dir = self.dir(name)?;
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;

        let mut index = load_index(&dir)?;
        let file = match index.entries.get(key) {
            Some(meta) => meta.file.clone(),
            None => {
                index.next_id += 1;
                format!("entry-{}.bin", index.next_id)
            }
        };

        let body_path = dir.join(&file);
        std::fs::write(&body_path, &response.body).map_err(|e| io_err(&body_path, e))?;

        index.entries.insert(
            key.to_string(),
            EntryMeta {
                file,
                status: response.status,
                content_type: response.content_type.clone(),
            },
        );
        save_index(&dir, &index)
    }

    fn dir(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if !valid {
            return Err(CacheError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

fn load_index(dir: &Path) -> Result<Index> {
    let path = dir.join(INDEX_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Index::default()),
        Err(e) => return Err(io_err(&path, e)),
    };
    serde_json::from_str(&content).map_err(|e| CacheError::Index { path, source: e })
}

fn save_index(dir: &Path, index: &Index) -> Result<()> {
    let path = dir.join(INDEX_FILE);
    let tmp = dir.join(format!("{}.tmp", INDEX_FILE));
    let content = serde_json::to_string_pretty(index).map_err(|e| CacheError::Index {
        path: path.clone(),
        source: e,
    })?;
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))
}

fn io_err(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}
