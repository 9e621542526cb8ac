//! Artist image resolution.
//!
//! [`ImageResolver`] ties the cache, the configured image source and the
//! blob store together. A fresh cache hit is returned without touching the
//! network. Otherwise the source is asked for a URL, the image is mirrored
//! into the blob store when possible, and the new record is written back.
//!
//! Only a source failure fails a resolution. Cache reads that error are
//! treated as misses, while cache writes and blob uploads that fail are
//! logged and the record is still returned.

use std::sync::Arc;
use std::time::Duration;

use artistpic_common::{normalize_key, CachedImageRecord};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::blob::{object_key, BlobError, BlobStore, ImageDownloader};
use crate::cache::CacheStore;
use crate::config::CacheConfig;
use crate::source::{ImageSource, SourceError};

/// Errors a caller of [`ImageResolver::resolve`] can observe.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("artist name is required")]
    InvalidInput,

    #[error("failed to fetch image for {artist}: {source}")]
    SourceUnavailable {
        artist: String,
        #[source]
        source: SourceError,
    },
}

/// Collaborators of the resolver.
#[derive(Clone)]
pub struct ResolverContext {
    pub cache: Arc<dyn CacheStore>,
    pub source: Arc<dyn ImageSource>,
    pub blobs: Arc<dyn BlobStore>,
    pub downloader: ImageDownloader,
}

/// Freshness and concurrency policy.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Records at least this old are refreshed.
    pub ttl: Duration,
    /// Return the stale record instead of failing when a refresh fails.
    pub serve_stale_on_error: bool,
    /// Share one upstream fetch between concurrent resolutions of an artist.
    pub coalesce_in_flight: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for ResolverConfig {
    fn from(config: &CacheConfig) -> Self {
        Self {
            ttl: config.ttl(),
            serve_stale_on_error: config.serve_stale_on_error,
            coalesce_in_flight: config.coalesce_in_flight,
        }
    }
}

pub struct ImageResolver {
    ctx: ResolverContext,
    config: ResolverConfig,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl ImageResolver {
    pub fn new(ctx: ResolverContext, config: ResolverConfig) -> Self {
        Self {
            ctx,
            config,
            in_flight: DashMap::new(),
        }
    }

    /// Produce a usable image record for `artist_name`.
    pub async fn resolve(&self, artist_name: &str) -> Result<CachedImageRecord, ResolveError> {
        let artist = artist_name.trim();
        if artist.is_empty() {
            return Err(ResolveError::InvalidInput);
        }

        let cached = self.lookup_cached(artist).await;
        if let Some(record) = fresh(cached.as_ref(), self.config.ttl) {
            tracing::debug!(artist, "Cache hit");
            return Ok(record);
        }

        if !self.config.coalesce_in_flight {
            return self.refresh(artist, cached).await;
        }

        let _slot = self.acquire_slot(normalize_key(artist)).await;

        // Another request may have refreshed the record while we waited.
        let cached = self.lookup_cached(artist).await;
        if let Some(record) = fresh(cached.as_ref(), self.config.ttl) {
            tracing::debug!(artist, "Cache hit after waiting on in-flight refresh");
            return Ok(record);
        }

        self.refresh(artist, cached).await
    }

    /// Number of cached artists.
    pub async fn cached_count(&self) -> artistpic_common::Result<u64> {
        self.ctx.cache.count().await
    }

    pub fn bucket(&self) -> &str {
        self.ctx.blobs.bucket()
    }

    pub fn storage_backend(&self) -> &'static str {
        self.ctx.blobs.backend()
    }

    pub fn database_backend(&self) -> &'static str {
        self.ctx.cache.backend()
    }

    async fn lookup_cached(&self, artist: &str) -> Option<CachedImageRecord> {
        match self.ctx.cache.lookup(artist).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(artist, error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }

    async fn refresh(
        &self,
        artist: &str,
        stale: Option<CachedImageRecord>,
    ) -> Result<CachedImageRecord, ResolveError> {
        let source_url = match self.ctx.source.resolve(artist).await {
            Ok(url) => url,
            Err(e) => {
                if self.config.serve_stale_on_error {
                    if let Some(record) = stale {
                        tracing::warn!(artist, error = %e, "Image source failed, serving stale record");
                        return Ok(record);
                    }
                }
                tracing::warn!(artist, source = self.ctx.source.id(), error = %e, "Image source failed");
                return Err(ResolveError::SourceUnavailable {
                    artist: artist.to_string(),
                    source: e,
                });
            }
        };

        let fetched_at = Utc::now();
        let image_key = match self.mirror(artist, &source_url, fetched_at).await {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(artist, error = %e, "Failed to store image, caching source URL");
                String::new()
            }
        };

        let url = if image_key.is_empty() {
            source_url
        } else {
            self.ctx.blobs.public_url(&image_key)
        };

        let record = CachedImageRecord::new(artist, image_key, url, self.ctx.source.id(), fetched_at);

        if let Err(e) = self.ctx.cache.upsert(&record).await {
            tracing::warn!(artist, error = %e, "Failed to save cache record");
        }

        tracing::info!(
            artist,
            key = %record.image_key,
            durable = record.is_durable(),
            "Resolved artist image"
        );
        Ok(record)
    }

    /// Copy the image at `source_url` into the blob store, returning its key.
    async fn mirror(
        &self,
        artist: &str,
        source_url: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<String, BlobError> {
        let image = self.ctx.downloader.fetch(source_url).await?;
        let key = object_key(artist, fetched_at.timestamp_millis(), &image.content_type);
        self.ctx
            .blobs
            .put(&key, image.data, &image.content_type)
            .await?;
        Ok(key)
    }

    async fn acquire_slot(&self, key: String) -> InFlightSlot<'_> {
        let lock = self.in_flight.entry(key.clone()).or_default().clone();
        let guard = lock.lock_owned().await;
        InFlightSlot {
            map: &self.in_flight,
            key,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }
}

fn fresh(record: Option<&CachedImageRecord>, ttl: Duration) -> Option<CachedImageRecord> {
    record
        .filter(|r| r.is_fresh(Utc::now(), ttl))
        .cloned()
}

/// Holds the per-artist lock; the map entry goes away with its last holder.
struct InFlightSlot<'a> {
    map: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.map
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
