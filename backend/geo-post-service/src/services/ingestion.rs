//! Post ingestion
//!
//! A post moves through `Authenticated -> Uploading -> Indexing -> Done`. Media
//! is uploaded first so the indexed document always carries a working URL. If
//! the index write fails the uploaded object is deleted again, so a failed
//! request leaves neither a searchable post nor a stored blob behind. A failed
//! delete is logged with the object id so the orphan can be swept later.

use super::blob_store::{BlobStore, MediaUpload, StorageError};
use super::geo_index::{GeoIndex, IndexError};
use crate::models::{Location, LocationError, Post};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionStage {
    Authenticated,
    Uploading,
    Indexing,
    Done,
}

impl fmt::Display for IngestionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestionStage::Authenticated => "authenticated",
            IngestionStage::Uploading => "uploading",
            IngestionStage::Indexing => "indexing",
            IngestionStage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("invalid location: {0}")]
    InvalidLocation(#[from] LocationError),

    #[error("image is not available")]
    MissingMedia,

    #[error("failed to save image to blob storage: {0}")]
    Upload(#[source] StorageError),

    #[error("failed to save post to index: {0}")]
    Index(#[source] IndexError),
}

impl IngestionError {
    /// Stage at which the request was aborted
    pub fn stage(&self) -> IngestionStage {
        match self {
            IngestionError::InvalidLocation(_) => IngestionStage::Authenticated,
            IngestionError::MissingMedia | IngestionError::Upload(_) => IngestionStage::Uploading,
            IngestionError::Index(_) => IngestionStage::Indexing,
        }
    }
}

/// Raw form values of a post request
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub message: String,
    pub media: Option<MediaUpload>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestedPost {
    pub id: Uuid,
    pub post: Post,
}

/// Sequences blob upload and index write for new posts
#[derive(Clone)]
pub struct PostIngestion {
    blobs: Arc<dyn BlobStore>,
    index: Arc<dyn GeoIndex>,
    bucket: String,
}

impl PostIngestion {
    pub fn new(blobs: Arc<dyn BlobStore>, index: Arc<dyn GeoIndex>, bucket: impl Into<String>) -> Self {
        Self {
            blobs,
            index,
            bucket: bucket.into(),
        }
    }

    /// Store a post owned by `owner`, the username taken from the verified
    /// session token
    pub async fn ingest(&self, owner: &str, form: PostForm) -> Result<IngestedPost, IngestionError> {
        let id = Uuid::new_v4();
        let object_id = id.to_string();

        // Authenticated
        let location = Location::parse(form.lat.as_deref(), form.lon.as_deref())?;

        // Uploading
        let media = form
            .media
            .filter(|media| !media.is_empty())
            .ok_or(IngestionError::MissingMedia)?;
        info!(
            post_id = %id,
            stage = %IngestionStage::Uploading,
            bytes = media.len(),
            "Uploading post media"
        );
        let url = self
            .blobs
            .upload(&self.bucket, &object_id, media)
            .await
            .map_err(|e| {
                error!(post_id = %id, bucket = %self.bucket, error = %e, "Media upload failed");
                IngestionError::Upload(e)
            })?;

        // Indexing
        let post = Post {
            user: owner.to_string(),
            message: form.message,
            location,
            url,
        };
        info!(post_id = %id, stage = %IngestionStage::Indexing, "Indexing post");
        if let Err(e) = self.index.put(&object_id, &post).await {
            error!(post_id = %id, error = %e, "Index write failed, removing uploaded media");
            self.discard_media(&object_id).await;
            return Err(IngestionError::Index(e));
        }

        info!(post_id = %id, user = %owner, stage = %IngestionStage::Done, "Post saved");
        Ok(IngestedPost { id, post })
    }

    async fn discard_media(&self, object_id: &str) {
        if let Err(e) = self.blobs.delete(&self.bucket, object_id).await {
            warn!(
                bucket = %self.bucket,
                object_id = %object_id,
                error = %e,
                "Failed to delete orphaned media"
            );
        }
    }
}
