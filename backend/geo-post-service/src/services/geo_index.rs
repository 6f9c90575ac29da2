use crate::models::{Distance, Location, Post};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index backend unavailable: {0}")]
    Backend(String),

    #[error("index request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed index response: {0}")]
    Decode(String),
}

/// Post storage with geo-distance search
#[async_trait]
pub trait GeoIndex: Send + Sync {
    /// Create the post and user collections when missing. Idempotent.
    async fn ensure_schema(&self) -> Result<(), IndexError>;

    /// Upsert `post` at `id`; the document is searchable once this returns
    async fn put(&self, id: &str, post: &Post) -> Result<(), IndexError>;

    /// Every post within `radius` of `center`, unpaginated and unsorted
    async fn search_within_radius(
        &self,
        center: Location,
        radius: Distance,
    ) -> Result<Vec<Post>, IndexError>;
}
