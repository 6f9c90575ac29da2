/// Business logic and backend adapters
///
/// Backends are reached through the [`CredentialStore`], [`BlobStore`] and
/// [`GeoIndex`] traits. Production deployments use Elasticsearch and GCS;
/// the in-memory implementations back tests and `BACKEND_MODE=memory`.
pub mod blob_store;
pub mod credentials;
pub mod elasticsearch;
pub mod gcs;
pub mod geo_index;
pub mod ingestion;
pub mod memory;

pub use blob_store::{BlobStore, MediaUpload, StorageError};
pub use credentials::{AccountService, CredentialError, CredentialStore};
pub use elasticsearch::{ElasticsearchClient, ElasticsearchError};
pub use gcs::GcsBlobStore;
pub use geo_index::{GeoIndex, IndexError};
pub use ingestion::{IngestedPost, IngestionError, IngestionStage, PostForm, PostIngestion};
pub use memory::{InMemoryBlobStore, InMemoryCredentialStore, InMemoryGeoIndex};
