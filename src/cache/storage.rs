//! SQLite-based cache storage with file blob support
//!
//! Persisted second tier of the query cache. Small payloads are stored inline
//! in SQLite, large ones (>10KB) as files.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CacheError;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

/// Responses larger than this are stored as external blobs
const INLINE_THRESHOLD: usize = 10 * 1024; // 10KB

type Result<T> = std::result::Result<T, CacheError>;

/// A persisted payload with its timestamps (Unix milliseconds)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub data: Vec<u8>,
    pub created_at: i64,
    pub expires_at: i64,
}

impl StoredEntry {
    /// Time left before expiry, as of `now_ms`
    pub fn remaining(&self, now_ms: i64) -> Duration {
        Duration::from_millis(self.expires_at.saturating_sub(now_ms).max(0) as u64)
    }
}

/// SQLite-backed cache storage with file blob support
pub struct CacheStorage {
    conn: Connection,
    blobs_dir: PathBuf,
}

impl CacheStorage {
    /// Open or create cache storage at the default XDG cache location
    pub fn open() -> Result<Self> {
        let cache_dir = Self::cache_dir()?;
        Self::open_at(&cache_dir)
    }

    /// Get the cache directory path (~/.cache/rentkit on Linux)
    pub fn cache_dir() -> Result<PathBuf> {
        let cache_base = dirs::cache_dir().ok_or(CacheError::NoHome)?;
        Ok(cache_base.join("rentkit"))
    }

    /// Open cache storage at a specific directory
    pub fn open_at(cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create cache dir: {}", e)))?;

        let db_path = cache_dir.join("cache.db");
        let blobs_dir = cache_dir.join("blobs");
        std::fs::create_dir_all(&blobs_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create blobs dir: {}", e)))?;

        let conn = Connection::open(&db_path)?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Cache schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            Self::nuke(&db_path, &blobs_dir)?;
            return Self::open_at(cache_dir);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                cache_key TEXT PRIMARY KEY NOT NULL,
                operation TEXT NOT NULL,
                data TEXT,
                blob_path TEXT,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_expires_at ON cache_entries(expires_at);
            CREATE INDEX IF NOT EXISTS idx_operation ON cache_entries(operation);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self { conn, blobs_dir })
    }

    /// Get cached data if valid (not expired)
    pub fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        self.get_at(key, Utc::now().timestamp_millis())
    }

    /// An entry is still valid at exactly its expiry instant
    fn get_at(&self, key: &str, now: i64) -> Result<Option<StoredEntry>> {
        let row: Option<(Option<String>, Option<String>, i64, i64)> = self
            .conn
            .query_row(
                "SELECT data, blob_path, created_at, expires_at FROM cache_entries
                 WHERE cache_key = ?1 AND expires_at >= ?2",
                params![key, now],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((data, blob_path, created_at, expires_at)) = row else {
            return Ok(None);
        };

        let data = match (data, blob_path) {
            (Some(data), None) => data.into_bytes(),
            (None, Some(blob_path)) => match std::fs::read(self.blobs_dir.join(&blob_path)) {
                Ok(data) => data,
                Err(e) => {
                    log::warn!("Failed to read blob {}: {}", blob_path, e);
                    self.delete_by_key(key)?;
                    return Ok(None);
                }
            },
            _ => return Ok(None),
        };

        Ok(Some(StoredEntry {
            data,
            created_at,
            expires_at,
        }))
    }

    /// Store data with TTL
    pub fn put(&self, key: &str, data: &[u8], operation: &str, ttl: Duration) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let expires = now.saturating_add(ttl.as_millis().min(i64::MAX as u128) as i64);

        // Drop any blob of a previous version of this entry
        self.remove_blob_for(key)?;

        if data.len() <= INLINE_THRESHOLD {
            self.conn.execute(
                "INSERT OR REPLACE INTO cache_entries
                 (cache_key, operation, data, blob_path, created_at, expires_at, size_bytes)
                 VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?6)",
                params![
                    key,
                    operation,
                    String::from_utf8_lossy(data).to_string(),
                    now,
                    expires,
                    data.len() as i64
                ],
            )?;
        } else {
            let blob_path = self.write_blob(key, data)?;
            self.conn.execute(
                "INSERT OR REPLACE INTO cache_entries
                 (cache_key, operation, data, blob_path, created_at, expires_at, size_bytes)
                 VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6)",
                params![key, operation, blob_path, now, expires, data.len() as i64],
            )?;
        }
        Ok(())
    }

    /// Clear all cache entries
    pub fn clear_all(&self) -> Result<ClearStats> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |r| r.get(0))?;

        self.conn.execute("DELETE FROM cache_entries", [])?;

        if self.blobs_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.blobs_dir) {
                log::warn!("Failed to clear blobs directory: {}", e);
            }
            std::fs::create_dir_all(&self.blobs_dir)
                .map_err(|e| CacheError::Io(format!("Failed to recreate blobs dir: {}", e)))?;
        }

        Ok(ClearStats {
            entries_removed: count as usize,
        })
    }

    /// Delete a specific cache entry by key
    pub fn delete_by_key(&self, key: &str) -> Result<bool> {
        self.remove_blob_for(key)?;
        let deleted = self
            .conn
            .execute("DELETE FROM cache_entries WHERE cache_key = ?1", [key])?;
        Ok(deleted > 0)
    }

    /// Delete every entry of one operation (used after mutations)
    pub fn delete_by_operation(&self, operation: &str) -> Result<usize> {
        let blobs = self.blob_paths(
            "SELECT blob_path FROM cache_entries WHERE operation = ?1 AND blob_path IS NOT NULL",
            params![operation],
        )?;
        self.remove_blobs(&blobs);

        let deleted = self.conn.execute(
            "DELETE FROM cache_entries WHERE operation = ?1",
            params![operation],
        )?;
        Ok(deleted)
    }

    /// Delete expired entries and their blobs
    pub fn delete_expired(&self) -> Result<usize> {
        self.delete_expired_at(Utc::now().timestamp_millis())
    }

    fn delete_expired_at(&self, now: i64) -> Result<usize> {
        let blobs = self.blob_paths(
            "SELECT blob_path FROM cache_entries WHERE expires_at < ?1 AND blob_path IS NOT NULL",
            params![now],
        )?;
        self.remove_blobs(&blobs);

        let deleted = self
            .conn
            .execute("DELETE FROM cache_entries WHERE expires_at < ?1", [now])?;
        Ok(deleted)
    }

    /// Get cache statistics
    pub fn stats(&self) -> Result<PersistedStats> {
        self.stats_at(Utc::now().timestamp_millis())
    }

    fn stats_at(&self, now: i64) -> Result<PersistedStats> {

        let total_entries: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM cache_entries", [], |r| r.get(0))?;

        let valid_entries: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cache_entries WHERE expires_at >= ?1",
            [now],
            |r| r.get(0),
        )?;

        let total_size: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(size_bytes), 0) FROM cache_entries",
            [],
            |r| r.get(0),
        )?;

        let (oldest, newest): (Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT MIN(created_at), MAX(created_at) FROM cache_entries WHERE expires_at >= ?1",
            [now],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        let mut by_operation = BTreeMap::new();
        let mut stmt = self.conn.prepare(
            "SELECT operation, COUNT(*), COALESCE(SUM(size_bytes), 0) FROM cache_entries
             WHERE expires_at >= ?1 GROUP BY operation",
        )?;
        let rows = stmt.query_map([now], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?, r.get::<_, i64>(2)?))
        })?;
        for row in rows {
            let (operation, count, bytes) = row?;
            by_operation.insert(operation, (count as usize, bytes as usize));
        }

        Ok(PersistedStats {
            total_entries: total_entries as usize,
            valid_entries: valid_entries as usize,
            expired_entries: (total_entries - valid_entries) as usize,
            total_size_bytes: total_size as usize,
            oldest_entry: oldest,
            newest_entry: newest,
            by_operation,
        })
    }

    /// Write a blob file, sharded by first 2 chars of key
    fn write_blob(&self, key: &str, data: &[u8]) -> Result<String> {
        let filename = format!("{}.json", sanitize(key));
        let shard: String = filename.chars().take(2).collect();
        let shard_dir = self.blobs_dir.join(&shard);
        std::fs::create_dir_all(&shard_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create shard dir: {}", e)))?;

        let rel_path = format!("{}/{}", shard, filename);
        std::fs::write(shard_dir.join(&filename), data)
            .map_err(|e| CacheError::Io(format!("Failed to write blob: {}", e)))?;

        Ok(rel_path)
    }

    fn remove_blob_for(&self, key: &str) -> Result<()> {
        let blobs = self.blob_paths(
            "SELECT blob_path FROM cache_entries WHERE cache_key = ?1 AND blob_path IS NOT NULL",
            params![key],
        )?;
        self.remove_blobs(&blobs);
        Ok(())
    }

    fn blob_paths(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let paths = stmt
            .query_map(args, |r| r.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(paths)
    }

    fn remove_blobs(&self, paths: &[String]) {
        for path in paths {
            if let Err(e) = std::fs::remove_file(self.blobs_dir.join(path)) {
                log::debug!("Blob {} already gone: {}", path, e);
            }
        }
    }

    /// Nuke the cache (delete DB and all blobs)
    fn nuke(db_path: &Path, blobs_dir: &Path) -> Result<()> {
        if db_path.exists() {
            std::fs::remove_file(db_path)
                .map_err(|e| CacheError::Io(format!("Failed to remove cache DB: {}", e)))?;
        }
        if blobs_dir.exists() {
            std::fs::remove_dir_all(blobs_dir)
                .map_err(|e| CacheError::Io(format!("Failed to remove blobs dir: {}", e)))?;
        }
        Ok(())
    }
}

/// Keys look like `operation:digest`; keep file names portable
fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Statistics about cache clear operation
#[derive(Debug)]
pub struct ClearStats {
    pub entries_removed: usize,
}

/// Statistics about the persisted cache
#[derive(Debug)]
pub struct PersistedStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub total_size_bytes: usize,
    pub oldest_entry: Option<i64>,
    pub newest_entry: Option<i64>,
    /// operation → (valid entries, bytes)
    pub by_operation: BTreeMap<String, (usize, usize)>,
}
