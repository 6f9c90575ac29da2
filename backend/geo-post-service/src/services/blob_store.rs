use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Media bytes received with a post
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub bytes: Bytes,
    pub content_type: String,
}

impl MediaUpload {
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type
                .filter(|ct| !ct.is_empty())
                .unwrap_or(DEFAULT_CONTENT_TYPE)
                .to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Durable object storage for post media
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `media` under `object_id` in `bucket`, make it publicly readable
    /// and return its permanent URL
    async fn upload(
        &self,
        bucket: &str,
        object_id: &str,
        media: MediaUpload,
    ) -> Result<String, StorageError>;

    /// Remove an object. Deleting a missing object is not an error.
    async fn delete(&self, bucket: &str, object_id: &str) -> Result<(), StorageError>;
}
