//! Elasticsearch adapter tests against a mock HTTP server
//!
//! Checks the request paths and query strings the client sends and how
//! response statuses map onto `IndexError` and `CredentialError`.

use geo_post_service::models::{Location, Post, User};
use geo_post_service::services::{
    CredentialError, CredentialStore, ElasticsearchClient, GeoIndex, IndexError,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const POST_INDEX: &str = "post";
const USER_INDEX: &str = "user";

fn client(server: &MockServer) -> ElasticsearchClient {
    ElasticsearchClient::new(&server.uri(), POST_INDEX, USER_INDEX).unwrap()
}

fn es_response(status: u16) -> ResponseTemplate {
    ResponseTemplate::new(status).insert_header("X-Elastic-Product", "Elasticsearch")
}

fn post_hit(n: usize) -> Value {
    json!({
        "_id": format!("post-{n}"),
        "_source": {
            "user": "bob",
            "message": format!("post {n}"),
            "location": { "lat": 40.0, "lon": -73.0 },
            "url": format!("https://storage.googleapis.com/around-bucket/post-{n}")
        }
    })
}

fn scroll_page(scroll_id: &str, range: std::ops::Range<usize>) -> Value {
    let hits: Vec<Value> = range.map(post_hit).collect();
    json!({ "_scroll_id": scroll_id, "hits": { "hits": hits } })
}

fn sample_post() -> Post {
    Post {
        user: "bob".into(),
        message: "hello".into(),
        location: Location::new(40.0, -73.0).unwrap(),
        url: "https://storage.googleapis.com/around-bucket/post-1".into(),
    }
}

fn sample_user() -> User {
    User {
        username: "bob".into(),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
        age: 20,
        gender: "male".into(),
    }
}

// ============================================================================
// Schema
// ============================================================================

#[tokio::test]
async fn test_ensure_schema_creates_missing_indices() {
    let server = MockServer::start().await;

    for index in [POST_INDEX, USER_INDEX] {
        Mock::given(method("HEAD"))
            .and(path(format!("/{index}")))
            .respond_with(es_response(404))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("PUT"))
        .and(path("/post"))
        .and(body_partial_json(json!({
            "mappings": { "properties": { "location": { "type": "geo_point" } } }
        })))
        .respond_with(es_response(200).set_body_json(json!({ "acknowledged": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/user"))
        .respond_with(es_response(200).set_body_json(json!({ "acknowledged": true })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).ensure_schema().await.unwrap();
}

#[tokio::test]
async fn test_ensure_schema_is_idempotent() {
    let server = MockServer::start().await;

    // Post index already present; user index created concurrently by another instance
    Mock::given(method("HEAD"))
        .and(path("/post"))
        .respond_with(es_response(200))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/post"))
        .respond_with(es_response(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/user"))
        .respond_with(es_response(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/user"))
        .respond_with(es_response(400).set_body_json(json!({
            "error": {
                "type": "resource_already_exists_exception",
                "reason": "index [user/abc] already exists"
            },
            "status": 400
        })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).ensure_schema().await.unwrap();
}

#[tokio::test]
async fn test_ensure_schema_surfaces_unexpected_exists_status() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/post"))
        .respond_with(es_response(503))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/post"))
        .respond_with(es_response(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server).ensure_schema().await.unwrap_err();
    assert!(matches!(err, IndexError::Rejected { status: 503, .. }), "{err:?}");
}

// ============================================================================
// Put
// ============================================================================

#[tokio::test]
async fn test_put_waits_for_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/post/_doc/post-1"))
        .and(query_param("refresh", "wait_for"))
        .and(body_partial_json(json!({
            "user": "bob",
            "location": { "lat": 40.0, "lon": -73.0 }
        })))
        .respond_with(es_response(201).set_body_json(json!({
            "_index": "post", "_id": "post-1", "result": "created"
        })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).put("post-1", &sample_post()).await.unwrap();
}

#[tokio::test]
async fn test_put_rejection_maps_status() {
    let server = MockServer::start().await;

    Mock::given(path("/post/_doc/post-1"))
        .respond_with(es_response(429).set_body_string("too many requests"))
        .mount(&server)
        .await;

    let err = client(&server)
        .put("post-1", &sample_post())
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::Rejected { status: 429, .. }), "{err:?}");
}

// ============================================================================
// Scroll search
// ============================================================================

#[tokio::test]
async fn test_search_scrolls_past_first_page_and_clears() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/_search/scroll"))
        .and(body_partial_json(json!({ "scroll_id": ["scroll-1"] })))
        .respond_with(es_response(200).set_body_json(json!({ "succeeded": true, "num_freed": 1 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/post/_search"))
        .and(query_param("scroll", "1m"))
        .and(query_param("size", "500"))
        .and(body_partial_json(json!({
            "query": { "bool": { "filter": { "geo_distance": { "distance": "10km" } } } }
        })))
        .respond_with(es_response(200).set_body_json(scroll_page("scroll-1", 0..500)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/_search/scroll"))
        .and(body_partial_json(json!({ "scroll": "1m", "scroll_id": "scroll-1" })))
        .respond_with(es_response(200).set_body_json(scroll_page("scroll-1", 500..503)))
        .expect(1)
        .mount(&server)
        .await;

    let posts = client(&server)
        .search_within_radius(Location::new(40.0, -73.0).unwrap(), "10".parse().unwrap())
        .await
        .unwrap();

    assert_eq!(posts.len(), 503);
    assert_eq!(posts[0].message, "post 0");
    assert_eq!(posts[502].message, "post 502");
}

#[tokio::test]
async fn test_scroll_context_cleared_when_page_fails() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/_search/scroll"))
        .respond_with(es_response(200).set_body_json(json!({ "succeeded": true, "num_freed": 1 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/post/_search"))
        .respond_with(es_response(200).set_body_json(scroll_page("scroll-1", 0..500)))
        .mount(&server)
        .await;
    Mock::given(path("/_search/scroll"))
        .respond_with(es_response(500).set_body_string("search_context_missing_exception"))
        .mount(&server)
        .await;

    let err = client(&server)
        .search_within_radius(Location::new(40.0, -73.0).unwrap(), "10".parse().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::Rejected { status: 500, .. }), "{err:?}");
}

// ============================================================================
// Credentials
// ============================================================================

#[tokio::test]
async fn test_insert_creates_document_keyed_by_username() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/user/_create/bob"))
        .and(query_param("refresh", "wait_for"))
        .and(body_partial_json(json!({ "username": "bob", "age": 20 })))
        .respond_with(es_response(201).set_body_json(json!({
            "_index": "user", "_id": "bob", "result": "created"
        })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).insert_if_absent(&sample_user()).await.unwrap();
}

#[tokio::test]
async fn test_insert_conflict_maps_to_already_exists() {
    let server = MockServer::start().await;

    Mock::given(path("/user/_create/bob"))
        .respond_with(es_response(409).set_body_json(json!({
            "error": { "type": "version_conflict_engine_exception" },
            "status": 409
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .insert_if_absent(&sample_user())
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::AlreadyExists(ref name) if name == "bob"), "{err:?}");
}

#[tokio::test]
async fn test_find_by_username_uses_term_query() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/_search/scroll"))
        .respond_with(es_response(200).set_body_json(json!({ "succeeded": true, "num_freed": 1 })))
        .mount(&server)
        .await;
    Mock::given(path("/user/_search"))
        .and(body_partial_json(json!({ "query": { "term": { "username": "bob" } } })))
        .respond_with(es_response(200).set_body_json(json!({
            "_scroll_id": "scroll-u",
            "hits": { "hits": [ { "_id": "bob", "_source": sample_user() } ] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let users = client(&server).find_by_username("bob").await.unwrap();
    assert_eq!(users, vec![sample_user()]);
}

#[tokio::test]
async fn test_find_by_username_backend_failure() {
    let server = MockServer::start().await;

    Mock::given(path("/user/_search"))
        .respond_with(es_response(503))
        .mount(&server)
        .await;

    let err = client(&server).find_by_username("bob").await.unwrap_err();
    assert!(matches!(err, CredentialError::Backend(_)), "{err:?}");
}
