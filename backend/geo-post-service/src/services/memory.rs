//! In-memory backends
//!
//! Used by the test suite and by `BACKEND_MODE=memory` for local development.
//! Nothing survives a restart.

use super::blob_store::{BlobStore, MediaUpload, StorageError};
use super::credentials::{CredentialError, CredentialStore};
use super::geo_index::{GeoIndex, IndexError};
use crate::models::{Distance, Location, Post, User};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{hash_map::Entry, HashMap, HashSet};
use tokio::sync::RwLock;

// ============================================================================
// Credential store
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Vec<User>, CredentialError> {
        Ok(self.users.read().await.get(username).cloned().into_iter().collect())
    }

    async fn insert_if_absent(&self, user: &User) -> Result<(), CredentialError> {
        match self.users.write().await.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(CredentialError::AlreadyExists(user.username.clone())),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }
}

// ============================================================================
// Geo index
// ============================================================================

/// Linear-scan index using haversine distance
#[derive(Debug, Default)]
pub struct InMemoryGeoIndex {
    posts: RwLock<HashMap<String, Post>>,
}

impl InMemoryGeoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.posts.read().await.len()
    }

    pub async fn get(&self, id: &str) -> Option<Post> {
        self.posts.read().await.get(id).cloned()
    }
}

#[async_trait]
impl GeoIndex for InMemoryGeoIndex {
    async fn ensure_schema(&self) -> Result<(), IndexError> {
        Ok(())
    }

    async fn put(&self, id: &str, post: &Post) -> Result<(), IndexError> {
        self.posts.write().await.insert(id.to_string(), post.clone());
        Ok(())
    }

    async fn search_within_radius(
        &self,
        center: Location,
        radius: Distance,
    ) -> Result<Vec<Post>, IndexError> {
        let limit = radius.as_meters();
        Ok(self
            .posts
            .read()
            .await
            .values()
            .filter(|post| center.distance_meters(&post.location) <= limit)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Blob store
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Object store with a fixed set of buckets. URLs use the `memory://` scheme.
#[derive(Debug)]
pub struct InMemoryBlobStore {
    buckets: HashSet<String>,
    objects: RwLock<HashMap<(String, String), StoredObject>>,
}

impl InMemoryBlobStore {
    pub fn new<I, S>(buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            buckets: buckets.into_iter().map(Into::into).collect(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn object_url(bucket: &str, object_id: &str) -> String {
        format!("memory://{bucket}/{object_id}")
    }

    pub async fn get(&self, bucket: &str, object_id: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), object_id.to_string()))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(
        &self,
        bucket: &str,
        object_id: &str,
        media: MediaUpload,
    ) -> Result<String, StorageError> {
        if !self.buckets.contains(bucket) {
            return Err(StorageError::BucketNotFound(bucket.to_string()));
        }

        self.objects.write().await.insert(
            (bucket.to_string(), object_id.to_string()),
            StoredObject {
                bytes: media.bytes,
                content_type: media.content_type,
            },
        );
        Ok(Self::object_url(bucket, object_id))
    }

    async fn delete(&self, bucket: &str, object_id: &str) -> Result<(), StorageError> {
        self.objects
            .write()
            .await
            .remove(&(bucket.to_string(), object_id.to_string()));
        Ok(())
    }
}
