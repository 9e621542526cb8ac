//! Cache Store port and its SQLite implementation.
//!
//! The resolver talks to the cache through the async [`CacheStore`] trait so
//! tests can substitute their own store. [`SqliteCacheStore`] runs the
//! blocking `artistpic_db` queries on Tokio's blocking pool, sharing one r2d2
//! pool across all concurrent requests.

use artistpic_common::{CachedImageRecord, Error, Result};
use artistpic_db::pool::{get_conn, DbPool};
use artistpic_db::queries::artist_images;
use async_trait::async_trait;
use rusqlite::Connection;

/// Durable mapping from normalized artist name to cached image record.
///
/// Implementations normalize the artist name themselves on both lookup and
/// upsert. They apply no freshness policy; that is the resolver's job.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short name of the storage engine, reported by the stats endpoint.
    fn backend(&self) -> &'static str;

    /// Find the record for `artist_name`. A miss is `Ok(None)`.
    async fn lookup(&self, artist_name: &str) -> Result<Option<CachedImageRecord>>;

    /// Insert `record`, atomically replacing any record with the same key.
    async fn upsert(&self, record: &CachedImageRecord) -> Result<()>;

    /// Number of distinct cached artists.
    async fn count(&self) -> Result<u64>;
}

/// [`CacheStore`] backed by the SQLite `artist_images` table.
#[derive(Clone)]
pub struct SqliteCacheStore {
    pool: DbPool,
}

impl SqliteCacheStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Most recently refreshed records, newest first.
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<CachedImageRecord>> {
        self.with_conn(move |conn| artist_images::list_recent(conn, limit))
            .await
    }

    /// Run `f` with a pooled connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            f(&conn)
        })
        .await
        .map_err(|e| Error::internal(format!("cache task failed: {e}")))?
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn lookup(&self, artist_name: &str) -> Result<Option<CachedImageRecord>> {
        let name = artist_name.to_string();
        self.with_conn(move |conn| artist_images::get_by_name(conn, &name))
            .await
    }

    async fn upsert(&self, record: &CachedImageRecord) -> Result<()> {
        let record = record.clone();
        self.with_conn(move |conn| artist_images::upsert(conn, &record))
            .await
    }

    async fn count(&self) -> Result<u64> {
        self.with_conn(artist_images::count).await
    }
}
