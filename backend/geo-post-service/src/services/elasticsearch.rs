use super::credentials::{CredentialError, CredentialStore};
use super::geo_index::{GeoIndex, IndexError};
use crate::models::{Distance, Location, Post, User};
use async_trait::async_trait;
use elasticsearch::{
    http::response::Response,
    http::transport::{BuildError, SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    params::Refresh,
    ClearScrollParts, CreateParts, Elasticsearch, IndexParts, ScrollParts, SearchParts,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Scroll context lifetime between pages
const SCROLL_KEEP_ALIVE: &str = "1m";
const SCROLL_PAGE_SIZE: i64 = 500;

#[derive(Debug, Error)]
pub enum ElasticsearchError {
    #[error("invalid Elasticsearch URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to build transport: {0}")]
    TransportBuild(#[from] BuildError),
    #[error("transport error: {0}")]
    Transport(#[from] elasticsearch::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<ElasticsearchError> for IndexError {
    fn from(err: ElasticsearchError) -> Self {
        match err {
            ElasticsearchError::Status { status, body } => IndexError::Rejected { status, body },
            ElasticsearchError::Serde(e) => IndexError::Decode(e.to_string()),
            other => IndexError::Backend(other.to_string()),
        }
    }
}

impl From<ElasticsearchError> for CredentialError {
    fn from(err: ElasticsearchError) -> Self {
        CredentialError::Backend(err.to_string())
    }
}

/// Elasticsearch-backed post index and user store
#[derive(Clone)]
pub struct ElasticsearchClient {
    client: Elasticsearch,
    post_index: String,
    user_index: String,
}

impl ElasticsearchClient {
    pub fn new(url: &str, post_index: &str, user_index: &str) -> Result<Self, ElasticsearchError> {
        let parsed = Url::parse(url)?;
        let pool = SingleNodeConnectionPool::new(parsed);
        let transport = TransportBuilder::new(pool).build()?;
        let client = Elasticsearch::new(transport);

        Ok(Self {
            client,
            post_index: post_index.to_string(),
            user_index: user_index.to_string(),
        })
    }

    async fn ensure_post_index(&self) -> Result<(), ElasticsearchError> {
        let body = json!({
            "mappings": {
                "properties": {
                    "user": { "type": "keyword" },
                    "message": { "type": "text" },
                    "location": { "type": "geo_point" },
                    "url": { "type": "keyword", "index": false }
                }
            }
        });
        self.ensure_index(&self.post_index, body).await
    }

    async fn ensure_user_index(&self) -> Result<(), ElasticsearchError> {
        let body = json!({
            "mappings": {
                "properties": {
                    "username": { "type": "keyword" },
                    "password_hash": { "type": "keyword", "index": false },
                    "age": { "type": "integer" },
                    "gender": { "type": "keyword" }
                }
            }
        });
        self.ensure_index(&self.user_index, body).await
    }

    async fn ensure_index(&self, index: &str, body: Value) -> Result<(), ElasticsearchError> {
        let exists_response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await?;

        match exists_response.status_code().as_u16() {
            404 => {}
            status if (200..300).contains(&status) => return Ok(()),
            status => {
                let body = exists_response.text().await.unwrap_or_default();
                return Err(ElasticsearchError::Status { status, body });
            }
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body)
            .send()
            .await?;

        let status = response.status_code();
        if status.is_success() {
            info!(index = %index, "Created Elasticsearch index");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        // Another instance created it between our exists and create calls
        if body.contains("resource_already_exists_exception") {
            return Ok(());
        }
        Err(ElasticsearchError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Run `query` against `index` and collect every hit through the scroll API
    async fn scroll_all<T: DeserializeOwned>(
        &self,
        index: &str,
        query: Value,
    ) -> Result<Vec<T>, ElasticsearchError> {
        let mut scroll_id = None;
        let result = self.collect_pages(index, query, &mut scroll_id).await;

        // The server-side context is released whether or not every page arrived
        if let Some(id) = scroll_id {
            self.clear_scroll(id).await;
        }

        let documents = result?;
        debug!(index = %index, hits = documents.len(), "Scroll search complete");
        Ok(documents)
    }

    async fn collect_pages<T: DeserializeOwned>(
        &self,
        index: &str,
        query: Value,
        scroll_id: &mut Option<String>,
    ) -> Result<Vec<T>, ElasticsearchError> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .scroll(SCROLL_KEEP_ALIVE)
            .size(SCROLL_PAGE_SIZE)
            .body(json!({ "query": query }))
            .send()
            .await?;

        let mut page: ScrollPage = read_json(response).await?;
        *scroll_id = page.scroll_id.take();
        let mut documents = Vec::new();

        loop {
            let page_len = page.hits.hits.len();
            documents.extend(
                page.hits
                    .hits
                    .into_iter()
                    .filter_map(|hit| decode_source(index, hit)),
            );

            if page_len < SCROLL_PAGE_SIZE as usize {
                break;
            }
            let Some(id) = scroll_id.clone() else {
                break;
            };

            let response = self
                .client
                .scroll(ScrollParts::None)
                .body(json!({ "scroll": SCROLL_KEEP_ALIVE, "scroll_id": id }))
                .send()
                .await?;
            page = read_json(response).await?;
            if let Some(next) = page.scroll_id.take() {
                *scroll_id = Some(next);
            }
        }

        Ok(documents)
    }

    async fn clear_scroll(&self, scroll_id: String) {
        let result = self
            .client
            .clear_scroll(ClearScrollParts::None)
            .body(json!({ "scroll_id": [scroll_id] }))
            .send()
            .await;

        if let Err(e) = result {
            warn!(error = %e, "Failed to clear scroll context");
        }
    }
}

#[async_trait]
impl GeoIndex for ElasticsearchClient {
    async fn ensure_schema(&self) -> Result<(), IndexError> {
        self.ensure_post_index().await?;
        self.ensure_user_index().await?;
        Ok(())
    }

    async fn put(&self, id: &str, post: &Post) -> Result<(), IndexError> {
        let response = self
            .client
            .index(IndexParts::IndexId(&self.post_index, id))
            .refresh(Refresh::WaitFor)
            .body(post)
            .send()
            .await
            .map_err(ElasticsearchError::from)?;

        ensure_success(response).await?;
        debug!(post_id = %id, index = %self.post_index, "Post indexed");
        Ok(())
    }

    async fn search_within_radius(
        &self,
        center: Location,
        radius: Distance,
    ) -> Result<Vec<Post>, IndexError> {
        let posts = self
            .scroll_all(&self.post_index, geo_distance_query(center, radius))
            .await?;
        Ok(posts)
    }
}

#[async_trait]
impl CredentialStore for ElasticsearchClient {
    async fn find_by_username(&self, username: &str) -> Result<Vec<User>, CredentialError> {
        let users = self
            .scroll_all(&self.user_index, username_query(username))
            .await?;
        Ok(users)
    }

    /// The username is the document id, so `_create` rejects duplicates with 409
    async fn insert_if_absent(&self, user: &User) -> Result<(), CredentialError> {
        let response = self
            .client
            .create(CreateParts::IndexId(&self.user_index, &user.username))
            .refresh(Refresh::WaitFor)
            .body(user)
            .send()
            .await
            .map_err(ElasticsearchError::from)?;

        if response.status_code().as_u16() == 409 {
            return Err(CredentialError::AlreadyExists(user.username.clone()));
        }
        ensure_success(response).await?;
        Ok(())
    }
}

fn geo_distance_query(center: Location, radius: Distance) -> Value {
    json!({
        "bool": {
            "must": { "match_all": {} },
            "filter": {
                "geo_distance": {
                    "distance": radius.to_string(),
                    "location": { "lat": center.lat, "lon": center.lon }
                }
            }
        }
    })
}

fn username_query(username: &str) -> Value {
    json!({ "term": { "username": username } })
}

async fn ensure_success(response: Response) -> Result<(), ElasticsearchError> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(ElasticsearchError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ElasticsearchError> {
    let status = response.status_code();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ElasticsearchError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json::<T>().await?)
}

/// Documents that do not match the expected shape are skipped
fn decode_source<T: DeserializeOwned>(index: &str, hit: Hit) -> Option<T> {
    let source = hit.source?;
    match serde_json::from_value(source) {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!(index = %index, id = ?hit.id, error = %e, "Skipping malformed document");
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScrollPage {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    hits: InnerHits,
}

#[derive(Debug, Deserialize)]
struct InnerHits {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(rename = "_source")]
    source: Option<Value>,
}
