//! Command runners: the glue that enumerates paths, partitions them by
//! file type, routes them through the cache and hasher, and aggregates
//! results for the `hash`/`dup`/`cache` CLI commands.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::cache::{CacheItem, CacheKey, SqliteCache};
use crate::error::Result;
use crate::hasher::{file_type_of, FileType, HashType, Hasher};
use crate::pool::Pool;
use crate::scanner::{ExtensionPolicy, ScanEntry, Scanner};

/// Shared run configuration for `hash` and `dup`.
pub struct RunOptions {
    pub recursive: bool,
    pub use_builtin_filter: bool,
    pub ext_white: Vec<String>,
    pub ext_black: Vec<String>,
    pub jobs: usize,
    pub hash_type: HashType,
    pub use_cache: bool,
    pub cache_path: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            use_builtin_filter: true,
            ext_white: Vec::new(),
            ext_black: Vec::new(),
            jobs: 0,
            hash_type: HashType::default(),
            use_cache: false,
            cache_path: None,
        }
    }
}

/// One hashed file, as emitted by the `hash` command.
#[derive(Debug, Clone)]
pub struct FileHash {
    pub path: PathBuf,
    pub hash: u64,
}

/// Progress callback invoked as `(done, total)` after each file completes.
pub type ProgressFn<'a> = dyn Fn(usize, usize) + Send + Sync + 'a;

fn open_cache(opts: &RunOptions) -> Result<Option<Arc<SqliteCache>>> {
    if !opts.use_cache {
        return Ok(None);
    }
    let path = opts
        .cache_path
        .clone()
        .unwrap_or_else(crate::cache::default_cache_path);
    Ok(Some(Arc::new(SqliteCache::init(&path)?)))
}

fn enumerate(root: &Path, opts: &RunOptions) -> Result<Vec<ScanEntry>> {
    let ext_policy = ExtensionPolicy::new(opts.ext_white.clone(), opts.ext_black.clone());
    let scanner = Scanner::new(opts.recursive, opts.use_builtin_filter, ext_policy);
    let mut entries = scanner.scan(root)?;
    entries.retain(|e| file_type_of(Path::new(&e.file)) != FileType::Other);
    Ok(entries)
}

/// Looks up the cache, falling back to a live hash on a miss or a
/// consistency-check failure, and stores the result back. Cache
/// lookup errors degrade to a miss; cache insert errors are logged and
/// otherwise ignored — a failing cache never fails the overall run.
fn hash_one(path: &Path, hash_type: HashType, cache: Option<&SqliteCache>) -> u64 {
    let file_type = file_type_of(path);
    let hasher = Hasher::new(file_type, hash_type);

    let stat = std::fs::metadata(path).ok();
    let (size, mtime) = match &stat {
        Some(m) => (
            m.len(),
            m.modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0),
        ),
        None => (0, 0),
    };

    if let Some(cache) = cache {
        if let Ok(key) = CacheKey::from_path(path) {
            if let Some(hash) = cache.lookup_fresh(&key, size, mtime) {
                log::debug!("cache hit for {}", path.display());
                return hash;
            }
        }
    }

    let hash = match hasher.hash(path) {
        Ok(h) => h,
        Err(e) => {
            log::warn!("failed to hash {}: {e}", path.display());
            0
        }
    };

    if let Some(cache) = cache {
        if let Ok(key) = CacheKey::from_path(path) {
            let item = CacheItem {
                parent: key.parent,
                file: key.file,
                file_size: size,
                file_update_ts: mtime,
                rec_update_ts: 0,
                file_hash: hash,
            };
            if let Err(e) = cache.set(&item) {
                log::warn!("failed to update cache for {}: {e}", path.display());
            }
        }
    }

    hash
}

/// Runs the `hash` command: one entry per hashable file.
pub fn run_hash(root: &Path, opts: &RunOptions, progress: &ProgressFn) -> Result<Vec<FileHash>> {
    let entries = enumerate(root, opts)?;
    let total = entries.len();
    let cache = open_cache(opts)?;

    let results: Arc<Mutex<Vec<FileHash>>> = Arc::new(Mutex::new(Vec::with_capacity(total)));
    let done = Arc::new(std::sync::atomic::AtomicUsize::new(0));

    let pool = Pool::new(Pool::resolve_size(opts.jobs));
    for entry in entries {
        let path = entry.full_path();
        let hash_type = opts.hash_type;
        let cache = cache.clone();
        let results = Arc::clone(&results);
        let done = Arc::clone(&done);

        pool.commit(move || {
            let hash = hash_one(&path, hash_type, cache.as_deref());
            results.lock().unwrap().push(FileHash { path, hash });
        })?;
        let n = done.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        progress(n, total);
    }
    pool.stop();

    Ok(Arc::try_unwrap(results).unwrap().into_inner().unwrap())
}

/// Runs the `dup` command: groups files by identical hash, keeping
/// only groups with at least two members.
pub fn run_dup(
    root: &Path,
    opts: &RunOptions,
    progress: &ProgressFn,
) -> Result<Vec<(u64, Vec<PathBuf>)>> {
    let entries = enumerate(root, opts)?;
    let total = entries.len();
    let cache = open_cache(opts)?;

    let groups: Arc<Mutex<HashMap<u64, Vec<PathBuf>>>> = Arc::new(Mutex::new(HashMap::new()));
    let done = Arc::new(std::sync::atomic::AtomicUsize::new(0));

    let pool = Pool::new(Pool::resolve_size(opts.jobs));
    for entry in entries {
        let path = entry.full_path();
        let hash_type = opts.hash_type;
        let cache = cache.clone();
        let groups = Arc::clone(&groups);
        let done = Arc::clone(&done);

        pool.commit(move || {
            let hash = hash_one(&path, hash_type, cache.as_deref());
            groups.lock().unwrap().entry(hash).or_default().push(path);
        })?;
        let n = done.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        progress(n, total);
    }
    pool.stop();

    let groups = Arc::try_unwrap(groups).unwrap().into_inner().unwrap();
    Ok(groups.into_iter().filter(|(_, paths)| paths.len() >= 2).collect())
}

/// `cache --find`: the single cached hash for `path`, if present.
pub fn cache_find(cache: &SqliteCache, path: &Path) -> Result<Option<u64>> {
    let key = CacheKey::from_path(path).map_err(|e| crate::error::Error::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(cache.get(&key)?.map(|i| i.file_hash))
}

/// `cache --del`: removes the entry for `path`.
pub fn cache_del(cache: &SqliteCache, path: &Path) -> Result<()> {
    let key = CacheKey::from_path(path).map_err(|e| crate::error::Error::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    cache.del(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path, w: u32, h: u32, rgb: [u8; 3]) {
        let img = image::RgbImage::from_pixel(w, h, image::Rgb(rgb));
        img.save(path).unwrap();
    }

    #[test]
    fn run_hash_produces_one_entry_per_file() {
        let tmp = tempfile::tempdir().unwrap();
        write_png(&tmp.path().join("a.png"), 32, 32, [10, 20, 30]);
        write_png(&tmp.path().join("b.png"), 32, 32, [200, 10, 10]);

        let opts = RunOptions::default();
        let results = run_hash(tmp.path(), &opts, &|_, _| {}).unwrap();

        assert_eq!(results.len(), 2);
    }

    #[test]
    fn run_dup_groups_identical_images() {
        let tmp = tempfile::tempdir().unwrap();
        write_png(&tmp.path().join("a.png"), 32, 32, [10, 20, 30]);
        write_png(&tmp.path().join("b.png"), 32, 32, [10, 20, 30]);
        write_png(&tmp.path().join("c.png"), 32, 32, [240, 5, 5]);

        let opts = RunOptions::default();
        let groups = run_dup(tmp.path(), &opts, &|_, _| {}).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn run_hash_reuses_cache_on_unchanged_file() {
        let tmp = tempfile::tempdir().unwrap();
        write_png(&tmp.path().join("a.png"), 32, 32, [10, 20, 30]);

        let cache_path = tmp.path().join("cache.sqlite");
        let mut opts = RunOptions::default();
        opts.use_cache = true;
        opts.cache_path = Some(cache_path.clone());

        let first = run_hash(tmp.path(), &opts, &|_, _| {}).unwrap();
        let second = run_hash(tmp.path(), &opts, &|_, _| {}).unwrap();

        assert_eq!(first[0].hash, second[0].hash);
    }
}
