//! Startup wiring: configuration in, ready-to-use resolver out.

use std::sync::Arc;

use anyhow::{Context, Result};
use artistpic_db::pool::init_pool;

use crate::blob::{BlobStore, ImageDownloader, MemoryBlobStore, S3BlobStore};
use crate::cache::SqliteCacheStore;
use crate::config::{Config, StorageBackend, StorageConfig};
use crate::resolver::{ImageResolver, ResolverConfig, ResolverContext};
use crate::source::build_source;

/// Open the cache, connect storage and the image source, and build the
/// resolver.
///
/// Fails when the database cannot be opened or migrated, or when the blob
/// store is unreachable.
pub async fn build_resolver(config: &Config) -> Result<ImageResolver> {
    let cache = open_cache(config)?;

    let blobs = build_blob_store(&config.storage)?;
    blobs.check().await.with_context(|| {
        format!(
            "Object storage bucket '{}' at {} is not reachable",
            blobs.bucket(),
            config.storage.endpoint
        )
    })?;
    tracing::info!(
        backend = blobs.backend(),
        bucket = blobs.bucket(),
        "Object storage ready"
    );

    let source = build_source(&config.source)?;
    let downloader = ImageDownloader::new(config.storage.download_timeout())
        .context("Failed to build image download client")?
        .with_max_bytes(config.storage.max_image_bytes);

    let resolver = ImageResolver::new(
        ResolverContext {
            cache: Arc::new(cache),
            source,
            blobs,
            downloader,
        },
        ResolverConfig::from(&config.cache),
    );

    match resolver.cached_count().await {
        Ok(count) => tracing::info!("Cache holds {} artists", count),
        Err(e) => tracing::warn!("Failed to count cached artists: {}", e),
    }

    Ok(resolver)
}

/// Open (and migrate) the cache database without touching object storage.
pub fn open_cache(config: &Config) -> Result<SqliteCacheStore> {
    let db_path = config.database.path.to_string_lossy();
    tracing::info!("Initializing database at {}", db_path);
    let pool = init_pool(&db_path)
        .with_context(|| format!("Failed to open cache database at {}", db_path))?;
    Ok(SqliteCacheStore::new(pool))
}

/// Blob store selected by `storage.backend`.
pub fn build_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.backend {
        StorageBackend::S3 => Arc::new(
            S3BlobStore::from_config(config).context("Failed to configure object storage")?,
        ),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory blob store; mirrored images are lost on restart");
            Arc::new(MemoryBlobStore::new(
                config.bucket.clone(),
                config.public_endpoint().to_string(),
            ))
        }
    };
    Ok(store)
}
