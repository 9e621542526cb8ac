//! In-process blob store for local runs and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use super::{public_object_url, BlobError, BlobStore};

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

/// Keeps objects in a map. Can be switched into a failing mode to exercise
/// degraded resolution.
pub struct MemoryBlobStore {
    bucket: String,
    public_endpoint: String,
    objects: RwLock<HashMap<String, StoredObject>>,
    failing: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new(bucket: impl Into<String>, public_endpoint: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            public_endpoint: public_endpoint.into(),
            objects: RwLock::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `put` and `check` fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.objects.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn ensure_available(&self) -> Result<(), BlobError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BlobError::Unavailable(format!(
                "bucket '{}' is offline",
                self.bucket
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), BlobError> {
        self.ensure_available()?;
        self.objects.write().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        public_object_url(false, &self.public_endpoint, &self.bucket, key)
    }

    async fn check(&self) -> Result<(), BlobError> {
        self.ensure_available()
    }
}
