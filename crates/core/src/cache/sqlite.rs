use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::{now_secs, CacheItem, CacheKey};
use crate::error::{Error, Result};

/// Persistent fingerprint cache backed by a single SQLite file.
///
/// All access is serialized through one mutex guarding the connection,
/// matching the original tool's single-shared-handle design: the
/// database itself is cheap to hold a lock across (single-row upsert or
/// select), so a coarse mutex is enough and keeps the schema/connection
/// logic in one place.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Opens (creating if absent) the cache database at `path`, creating
    /// parent directories with mode 0755 as needed, and synchronizes the
    /// schema.
    pub fn init(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                create_dir_mode(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(|e| Error::InitDb {
            path: path.to_path_buf(),
            source: e,
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache_item (
                parent TEXT NOT NULL,
                file TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                file_update_ts INTEGER NOT NULL,
                rec_update_ts INTEGER NOT NULL,
                file_hash INTEGER NOT NULL,
                PRIMARY KEY (parent, file)
            )",
            [],
        )
        .map_err(|e| Error::InitDb {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory database, for unit tests that don't need to
    /// assert on-disk path behavior.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::InitDb {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache_item (
                parent TEXT NOT NULL,
                file TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                file_update_ts INTEGER NOT NULL,
                rec_update_ts INTEGER NOT NULL,
                file_hash INTEGER NOT NULL,
                PRIMARY KEY (parent, file)
            )",
            [],
        )
        .map_err(|e| Error::InitDb {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Returns the cached row for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Result<Option<CacheItem>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT parent, file, file_size, file_update_ts, rec_update_ts, file_hash
             FROM cache_item WHERE parent = ?1 AND file = ?2",
            params![key.parent, key.file],
            |row| {
                Ok(CacheItem {
                    parent: row.get(0)?,
                    file: row.get(1)?,
                    file_size: row.get::<_, i64>(2)? as u64,
                    file_update_ts: row.get(3)?,
                    rec_update_ts: row.get(4)?,
                    file_hash: row.get::<_, i64>(5)? as u64,
                })
            },
        )
        .optional()
        .map_err(|e| Error::InsertDb { source: e })
    }

    /// Upserts `item` by its `(parent, file)` primary key, stamping
    /// `rec_update_ts` to the current wall-clock time regardless of what
    /// the caller set it to.
    pub fn set(&self, item: &CacheItem) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO cache_item (parent, file, file_size, file_update_ts, rec_update_ts, file_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(parent, file) DO UPDATE SET
                file_size = excluded.file_size,
                file_update_ts = excluded.file_update_ts,
                rec_update_ts = excluded.rec_update_ts,
                file_hash = excluded.file_hash",
            params![
                item.parent,
                item.file,
                item.file_size as i64,
                item.file_update_ts,
                now_secs(),
                item.file_hash as i64,
            ],
        )
        .map_err(|e| Error::InsertDb { source: e })?;
        Ok(())
    }

    pub fn del(&self, key: &CacheKey) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM cache_item WHERE parent = ?1 AND file = ?2",
            params![key.parent, key.file],
        )
        .map_err(|e| Error::DeleteDb { source: e })?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM cache_item", [])
            .map_err(|e| Error::ClearDb { source: e })?;
        Ok(())
    }

    /// Evicts rows whose `rec_update_ts` is older than `period` seconds.
    pub fn prune(&self, period: i64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let cutoff = now_secs() - period;
        let n = conn
            .execute(
                "DELETE FROM cache_item WHERE rec_update_ts < ?1",
                params![cutoff],
            )
            .map_err(|e| Error::PruneDb { source: e })?;
        Ok(n)
    }

    /// Consistency-checked lookup: a hit counts only if both `file_size`
    /// and `file_update_ts` in the cached row equal the values the
    /// caller observed on the filesystem. Any mismatch is treated as a
    /// miss, forcing recomputation upstream.
    pub fn lookup_fresh(&self, key: &CacheKey, file_size: u64, file_update_ts: i64) -> Option<u64> {
        let item = self.get(key).ok()??;
        if item.file_size == file_size && item.file_update_ts == file_update_ts {
            Some(item.file_hash)
        } else {
            None
        }
    }
}

#[cfg(unix)]
fn create_dir_mode(path: &Path) -> Result<()> {
    use std::fs::DirBuilder;
    use std::os::unix::fs::DirBuilderExt;

    DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(path)
        .map_err(|e| Error::MkDir {
            path: path.to_path_buf(),
            source: e,
        })
}

#[cfg(not(unix))]
fn create_dir_mode(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| Error::MkDir {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Default cache path: `$HOME/.vhash/vhash_db.sqlite`.
pub fn default_cache_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".vhash").join("vhash_db.sqlite")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(parent: &str, file: &str, size: u64, mtime: i64, hash: u64) -> CacheItem {
        CacheItem {
            parent: parent.to_string(),
            file: file.to_string(),
            file_size: size,
            file_update_ts: mtime,
            rec_update_ts: 0,
            file_hash: hash,
        }
    }

    #[test]
    fn set_then_get_round_trips() {
        let cache = SqliteCache::in_memory().unwrap();
        let it = item("/home/user/documents/", "demo.jpg", 1024, 1652849680, 0x12345678);
        cache.set(&it).unwrap();

        let got = cache.get(&it.key()).unwrap().unwrap();
        assert_eq!(got.file_size, 1024);
        assert_eq!(got.file_hash, 0x12345678);
    }

    #[test]
    fn set_replaces_existing_row() {
        let cache = SqliteCache::in_memory().unwrap();
        let it = item("/home/user/documents/", "demo.jpg", 1024, 1652849680, 0x12345678);
        cache.set(&it).unwrap();

        let mut updated = it.clone();
        updated.file_size = 2048;
        cache.set(&updated).unwrap();

        let got = cache.get(&it.key()).unwrap().unwrap();
        assert_eq!(got.file_size, 2048);
    }

    #[test]
    fn del_removes_row() {
        let cache = SqliteCache::in_memory().unwrap();
        let it = item("/home/user/documents/", "demo.jpg", 1024, 1652849680, 0x12345678);
        cache.set(&it).unwrap();
        cache.del(&it.key()).unwrap();

        assert!(cache.get(&it.key()).unwrap().is_none());
    }

    #[test]
    fn clear_removes_all_rows() {
        let cache = SqliteCache::in_memory().unwrap();
        cache
            .set(&item("/a/", "one.jpg", 1, 1, 1))
            .unwrap();
        cache
            .set(&item("/b/", "two.jpg", 2, 2, 2))
            .unwrap();
        cache.clear().unwrap();

        assert!(cache.get(&CacheKey {
            parent: "/a/".to_string(),
            file: "one.jpg".to_string()
        }).unwrap().is_none());
        assert!(cache.get(&CacheKey {
            parent: "/b/".to_string(),
            file: "two.jpg".to_string()
        }).unwrap().is_none());
    }

    #[test]
    fn prune_evicts_rows_older_than_period() {
        let cache = SqliteCache::in_memory().unwrap();
        {
            let conn = cache.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO cache_item VALUES ('/a/', 'old.jpg', 1, 1, ?1, 1)",
                params![now_secs() - 1_000_000],
            )
            .unwrap();
        }
        cache
            .set(&item("/b/", "fresh.jpg", 2, 2, 2))
            .unwrap();

        let evicted = cache.prune(604800).unwrap();
        assert_eq!(evicted, 1);
        assert!(cache.get(&CacheKey {
            parent: "/b/".to_string(),
            file: "fresh.jpg".to_string()
        }).unwrap().is_some());
    }

    #[test]
    fn lookup_fresh_rejects_stale_stat() {
        let cache = SqliteCache::in_memory().unwrap();
        let it = item("/a/", "demo.jpg", 1024, 1652849680, 0x1);
        cache.set(&it).unwrap();

        assert_eq!(cache.lookup_fresh(&it.key(), 1024, 1652849680), Some(0x1));
        assert_eq!(cache.lookup_fresh(&it.key(), 2048, 1652849680), None);
    }
}
