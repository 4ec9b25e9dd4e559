mod sqlite;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub use sqlite::{default_cache_path, SqliteCache};

/// Composite primary key identifying a cached file: the absolute,
/// canonicalized parent directory (with a trailing separator) and the
/// bare filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub parent: String,
    pub file: String,
}

impl CacheKey {
    /// Splits `path` into the `(parent, file)` pair the cache keys on.
    /// `parent` always ends in a path separator.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let abs = std::fs::canonicalize(path)?;
        let file = abs
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = abs
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("/"));
        let mut parent = parent.to_string_lossy().into_owned();
        if !parent.ends_with(std::path::MAIN_SEPARATOR) {
            parent.push(std::path::MAIN_SEPARATOR);
        }
        Ok(Self { parent, file })
    }
}

/// A cached fingerprint row: `(parent, file)` primary key plus the
/// filesystem stat used to detect staleness and the computed hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem {
    pub parent: String,
    pub file: String,
    pub file_size: u64,
    pub file_update_ts: i64,
    pub rec_update_ts: i64,
    pub file_hash: u64,
}

impl CacheItem {
    pub fn key(&self) -> CacheKey {
        CacheKey {
            parent: self.parent.clone(),
            file: self.file.clone(),
        }
    }
}

pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
