//! S3-compatible blob store (MinIO, AWS S3, ...).

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, Attributes, ClientOptions, ObjectStore, PutOptions, PutPayload, RetryConfig,
};

use super::{public_object_url, BlobError, BlobStore};
use crate::config::StorageConfig;

/// Blob store writing to one bucket of an S3-compatible service.
///
/// Requests use path-style addressing so a bare MinIO endpoint works. Public
/// URLs are built against `public_endpoint` when configured, otherwise the
/// API endpoint.
pub struct S3BlobStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    public_endpoint: String,
    use_ssl: bool,
}

impl S3BlobStore {
    pub fn from_config(config: &StorageConfig) -> Result<Self, BlobError> {
        let scheme = if config.use_ssl { "https" } else { "http" };
        let client_options = ClientOptions::new()
            .with_timeout(config.timeout())
            .with_allow_http(!config.use_ssl);

        let store = AmazonS3Builder::new()
            .with_endpoint(format!("{scheme}://{}", config.endpoint))
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_access_key_id(&config.access_key)
            .with_secret_access_key(&config.secret_key)
            .with_virtual_hosted_style_request(false)
            .with_client_options(client_options)
            .with_retry(RetryConfig {
                max_retries: 2,
                retry_timeout: config.timeout(),
                ..Default::default()
            })
            .build()
            .map_err(|e| BlobError::Unavailable(e.to_string()))?;

        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
            public_endpoint: config.public_endpoint().to_string(),
            use_ssl: config.use_ssl,
        })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn backend(&self) -> &'static str {
        "minio"
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), BlobError> {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&ObjectPath::from(key), PutPayload::from(data), opts)
            .await
            .map_err(BlobError::Upload)?;

        tracing::debug!(bucket = %self.bucket, key, "Uploaded object");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        public_object_url(self.use_ssl, &self.public_endpoint, &self.bucket, key)
    }

    async fn check(&self) -> Result<(), BlobError> {
        self.store
            .list_with_delimiter(None)
            .await
            .map(|_| ())
            .map_err(|e| BlobError::Unavailable(format!("bucket '{}': {e}", self.bucket)))
    }
}
