use crate::config::PostsConfig;
use crate::models::Distance;
use crate::services::{
    AccountService, BlobStore, CredentialStore, GeoIndex, InMemoryBlobStore,
    InMemoryCredentialStore, InMemoryGeoIndex, PostIngestion,
};
use crypto_core::jwt::SessionKeys;
use std::sync::Arc;

/// Backend implementations the service runs against
#[derive(Clone)]
pub struct Backends {
    pub credentials: Arc<dyn CredentialStore>,
    pub index: Arc<dyn GeoIndex>,
    pub blobs: Arc<dyn BlobStore>,
}

impl Backends {
    /// Process-local backends with a single bucket
    pub fn in_memory(bucket: &str) -> Self {
        Self {
            credentials: Arc::new(InMemoryCredentialStore::new()),
            index: Arc::new(InMemoryGeoIndex::new()),
            blobs: Arc::new(InMemoryBlobStore::new([bucket])),
        }
    }
}

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub session_keys: Arc<SessionKeys>,
    pub ingestion: PostIngestion,
    pub index: Arc<dyn GeoIndex>,
    pub default_range: Distance,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        backends: Backends,
        session_keys: Arc<SessionKeys>,
        bucket: &str,
        posts: &PostsConfig,
    ) -> Self {
        Self {
            accounts: AccountService::new(backends.credentials),
            session_keys,
            ingestion: PostIngestion::new(backends.blobs, backends.index.clone(), bucket),
            index: backends.index,
            default_range: posts.default_range,
            max_upload_bytes: posts.max_upload_bytes,
        }
    }
}
