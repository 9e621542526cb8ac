//! Blob storage for mirrored artist images.
//!
//! The [`BlobStore`] trait is the seam between the resolver and object
//! storage. [`S3BlobStore`] talks to any S3-compatible service (MinIO in
//! production); [`MemoryBlobStore`] keeps objects in process for local runs
//! and tests. Both share the same public URL rule, [`public_object_url`].
//!
//! [`ImageDownloader`] fetches the upstream image bytes that get mirrored.

mod download;
mod memory;
mod s3;

use async_trait::async_trait;
use bytes::Bytes;

pub use download::{DownloadedImage, ImageDownloader, DEFAULT_CONTENT_TYPE, DEFAULT_MAX_IMAGE_BYTES};
pub use memory::{MemoryBlobStore, StoredObject};
pub use s3::S3BlobStore;

/// Errors from downloading or storing an image.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("failed to download image: {0}")]
    Download(#[source] reqwest::Error),

    #[error("failed to download image: status {0}")]
    DownloadStatus(u16),

    #[error("image exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("failed to upload to object storage: {0}")]
    Upload(#[source] object_store::Error),

    #[error("object storage unavailable: {0}")]
    Unavailable(String),
}

/// Object storage capability: store bytes under a key, compute public URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Short name of the storage service, reported by the stats endpoint.
    fn backend(&self) -> &'static str;

    /// Bucket the objects are written to.
    fn bucket(&self) -> &str;

    /// Store `data` under `key`, overwriting any existing object.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), BlobError>;

    /// Public URL of the object stored under `key`.
    fn public_url(&self, key: &str) -> String;

    /// Verify the bucket is reachable.
    async fn check(&self) -> Result<(), BlobError>;
}

/// Public URL rule shared by every backend:
/// `{http|https}://{endpoint}/{bucket}/{key}` with the key percent-encoded.
pub fn public_object_url(use_ssl: bool, endpoint: &str, bucket: &str, key: &str) -> String {
    let scheme = if use_ssl { "https" } else { "http" };
    format!(
        "{scheme}://{}/{bucket}/{}",
        endpoint.trim_end_matches('/'),
        urlencoding::encode(key)
    )
}

/// File extension for a downloaded image's content type.
pub fn extension_for(content_type: &str) -> &'static str {
    let content_type = content_type.to_ascii_lowercase();
    if content_type.contains("png") {
        ".png"
    } else if content_type.contains("webp") {
        ".webp"
    } else {
        ".jpg"
    }
}

/// Object key for an artist image fetched at `timestamp_millis`.
///
/// Only letters, digits, space, `-`, `_` and `.` survive from the artist
/// name; everything else becomes `_`. Object stores escape the rest on write,
/// which would make the stored key differ from the one in the public URL.
/// The timestamp keeps repeated fetches of the same artist from overwriting
/// each other.
pub fn object_key(artist_name: &str, timestamp_millis: i64, content_type: &str) -> String {
    let safe_name: String = artist_name
        .chars()
        .map(|c| match c {
            c if c.is_alphanumeric() => c,
            ' ' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect();
    format!(
        "{safe_name}_{timestamp_millis}{}",
        extension_for(content_type)
    )
}
