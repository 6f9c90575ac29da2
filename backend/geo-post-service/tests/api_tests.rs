//! HTTP tests for geo-post-service against in-memory backends
//!
//! Covers signup/login, authenticated posting and radius search, including the
//! error bodies and CORS headers on failure paths.

use actix_web::{http::StatusCode, test, web, App};
use crypto_core::jwt::SessionKeys;
use error_types::error_codes;
use geo_post_service::config::PostsConfig;
use geo_post_service::models::Distance;
use geo_post_service::{routes, AppState, Backends};
use serde_json::{json, Value};
use std::sync::Arc;

// FOR TESTING ONLY
const SECRET: &str = "api-test-secret-api-test-secret-0123456789";
const BUCKET: &str = "around-bucket";
const BOUNDARY: &str = "----geo-post-test-boundary";
const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

fn state_with_limit(max_upload_bytes: usize) -> AppState {
    let keys = Arc::new(SessionKeys::new(SECRET).unwrap());
    AppState::new(
        Backends::in_memory(BUCKET),
        keys,
        BUCKET,
        &PostsConfig {
            default_range: Distance::kilometers(200.0),
            max_upload_bytes,
        },
    )
}

fn state() -> AppState {
    state_with_limit(1024 * 1024)
}

macro_rules! init_app {
    ($state:expr) => {{
        let state: AppState = $state.clone();
        let keys = state.session_keys.clone();
        test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .wrap(routes::cors_headers())
                .configure(move |cfg| routes::configure(cfg, keys)),
        )
        .await
    }};
}

fn signup_req(username: &str, password: &str) -> test::TestRequest {
    test::TestRequest::post().uri("/signup").set_json(json!({
        "username": username,
        "password": password,
        "age": 20,
        "gender": "male"
    }))
}

fn login_req(username: &str, password: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/login")
        .set_json(json!({ "username": username, "password": password }))
}

fn multipart_body(fields: &[(&str, &str)], image: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"photo.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn post_req(token: &str, fields: &[(&str, &str)], image: Option<&[u8]>) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/post")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .insert_header((
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_body(fields, image))
}

fn search_req(token: &str, query: &str) -> test::TestRequest {
    test::TestRequest::get()
        .uri(&format!("/search?{query}"))
        .insert_header(("Authorization", format!("Bearer {token}")))
}

// ============================================================================
// Signup / Login
// ============================================================================

#[actix_web::test]
async fn test_signup_rejects_bad_usernames() {
    let app = init_app!(state());

    for name in ["", "Bob", "bob smith", "bob-1", "bob@x", "用户"] {
        let resp = test::call_service(&app, signup_req(name, "pw1").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{name:?}");
        assert_eq!(
            resp.headers().get("Access-Control-Allow-Origin").unwrap(),
            "*"
        );
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], error_codes::INVALID_USERNAME_OR_PASSWORD);
    }

    let resp = test::call_service(&app, signup_req("bob", "").to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_signup_rejects_oversized_username() {
    let app = init_app!(state());

    let name = "a".repeat(513);
    let resp = test::call_service(&app, signup_req(&name, "pw1").to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], error_codes::INVALID_USERNAME_OR_PASSWORD);
}

#[actix_web::test]
async fn test_signup_then_duplicate() {
    let app = init_app!(state());

    let resp = test::call_service(&app, signup_req("bob", "pw1").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("Content-Type").unwrap(),
        "text/plain; charset=utf-8"
    );
    assert_eq!(test::read_body(resp).await, "User added successfully.");

    let resp = test::call_service(&app, signup_req("bob", "pw2").to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], error_codes::USER_ALREADY_EXISTS);
}

#[actix_web::test]
async fn test_signup_malformed_json() {
    let app = init_app!(state());

    let req = test::TestRequest::post()
        .uri("/signup")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], error_codes::INVALID_REQUEST);
}

#[actix_web::test]
async fn test_login_failures_are_indistinguishable() {
    let app = init_app!(state());
    test::call_service(&app, signup_req("bob", "pw1").to_request()).await;

    let wrong_password = test::call_service(&app, login_req("bob", "nope").to_request()).await;
    let unknown_user = test::call_service(&app, login_req("alice", "pw1").to_request()).await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);

    let a: Value = test::read_body_json(wrong_password).await;
    let b: Value = test::read_body_json(unknown_user).await;
    assert_eq!(a["code"], error_codes::INVALID_CREDENTIALS);
    assert_eq!(a["code"], b["code"]);
    assert_eq!(a["message"], b["message"]);
}

#[actix_web::test]
async fn test_login_returns_verifiable_token() {
    let state = state();
    let app = init_app!(state);
    test::call_service(&app, signup_req("bob", "pw1").to_request()).await;

    let resp = test::call_service(&app, login_req("bob", "pw1").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let token = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();

    let claims = state.session_keys.verify(&token).unwrap();
    assert_eq!(claims.username, "bob");
}

// ============================================================================
// Posting and search
// ============================================================================

#[actix_web::test]
async fn test_end_to_end_post_and_search() {
    let app = init_app!(state());

    let resp = test::call_service(&app, signup_req("bob", "pw1").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, login_req("bob", "pw1").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let token = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();

    let fields = [("lat", "40.0"), ("lon", "-73.0"), ("message", "hello")];
    let resp = test::call_service(&app, post_req(&token, &fields, Some(JPEG)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, search_req(&token, "lat=40.0&lon=-73.0&range=10").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let posts: Value = test::read_body_json(resp).await;
    let posts = posts.as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["message"], "hello");
    assert_eq!(posts[0]["user"], "bob");
    assert!(!posts[0]["url"].as_str().unwrap().is_empty());
}

#[actix_web::test]
async fn test_post_without_image_writes_nothing() {
    let state = state();
    let app = init_app!(state);
    let token = state.session_keys.issue("bob").unwrap();

    let fields = [("lat", "40.0"), ("lon", "-73.0"), ("message", "no picture")];
    let resp = test::call_service(&app, post_req(&token, &fields, None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], error_codes::IMAGE_MISSING);

    let resp = test::call_service(&app, search_req(&token, "lat=40.0&lon=-73.0&range=10").to_request()).await;
    let posts: Value = test::read_body_json(resp).await;
    assert_eq!(posts, json!([]));
}

#[actix_web::test]
async fn test_search_radius_excludes_distant_posts() {
    let state = state();
    let app = init_app!(state);
    let token = state.session_keys.issue("bob").unwrap();

    let here = [("lat", "40.0"), ("lon", "-73.0"), ("message", "here")];
    // ~500 km north
    let far = [("lat", "44.5"), ("lon", "-73.0"), ("message", "far")];
    for fields in [&here[..], &far[..]] {
        let resp = test::call_service(&app, post_req(&token, fields, Some(JPEG)).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = test::call_service(&app, search_req(&token, "lat=40.0&lon=-73.0&range=1km").to_request()).await;
    let posts: Value = test::read_body_json(resp).await;
    let posts = posts.as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["message"], "here");

    let resp = test::call_service(&app, search_req(&token, "lat=40.0&lon=-73.0&range=600").to_request()).await;
    let posts: Value = test::read_body_json(resp).await;
    assert_eq!(posts.as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn test_search_default_range_is_200km() {
    let state = state();
    let app = init_app!(state);
    let token = state.session_keys.issue("bob").unwrap();

    // ~111 km and ~333 km north
    let near = [("lat", "41.0"), ("lon", "-73.0"), ("message", "near")];
    let beyond = [("lat", "43.0"), ("lon", "-73.0"), ("message", "beyond")];
    for fields in [&near[..], &beyond[..]] {
        test::call_service(&app, post_req(&token, fields, Some(JPEG)).to_request()).await;
    }

    let resp = test::call_service(&app, search_req(&token, "lat=40.0&lon=-73.0").to_request()).await;
    let posts: Value = test::read_body_json(resp).await;
    let posts = posts.as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["message"], "near");
}

#[actix_web::test]
async fn test_owner_comes_from_token() {
    let state = state();
    let app = init_app!(state);
    let token = state.session_keys.issue("bob").unwrap();

    let fields = [
        ("lat", "40.0"),
        ("lon", "-73.0"),
        ("message", "mine"),
        ("user", "mallory"),
    ];
    let resp = test::call_service(&app, post_req(&token, &fields, Some(JPEG)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, search_req(&token, "lat=40.0&lon=-73.0&range=1").to_request()).await;
    let posts: Value = test::read_body_json(resp).await;
    assert_eq!(posts[0]["user"], "bob");
}

#[actix_web::test]
async fn test_malformed_coordinates_rejected() {
    let state = state();
    let app = init_app!(state);
    let token = state.session_keys.issue("bob").unwrap();

    for query in ["lat=abc&lon=-73.0", "lon=-73.0", "lat=95&lon=0", "lat=0&lon=-200"] {
        let resp = test::call_service(&app, search_req(&token, query).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{query}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], error_codes::INVALID_LOCATION);
    }

    let fields = [("lat", "north"), ("lon", "-73.0"), ("message", "lost")];
    let resp = test::call_service(&app, post_req(&token, &fields, Some(JPEG)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], error_codes::INVALID_LOCATION);
}

#[actix_web::test]
async fn test_invalid_range_rejected() {
    let state = state();
    let app = init_app!(state);
    let token = state.session_keys.issue("bob").unwrap();

    for range in ["far", "-5", "0km"] {
        let query = format!("lat=40.0&lon=-73.0&range={range}");
        let resp = test::call_service(&app, search_req(&token, &query).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{range}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], error_codes::INVALID_RANGE);
    }
}

#[actix_web::test]
async fn test_upload_size_limit() {
    let state = state_with_limit(4);
    let app = init_app!(state);
    let token = state.session_keys.issue("bob").unwrap();

    let fields = [("lat", "40.0"), ("lon", "-73.0"), ("message", "big")];
    let resp = test::call_service(&app, post_req(&token, &fields, Some(JPEG)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], error_codes::UPLOAD_TOO_LARGE);
}

// ============================================================================
// Authentication gate
// ============================================================================

#[actix_web::test]
async fn test_protected_routes_require_token() {
    let app = init_app!(state());

    let fields = [("lat", "40.0"), ("lon", "-73.0"), ("message", "anon")];
    let req = test::TestRequest::post()
        .uri("/post")
        .insert_header((
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_body(&fields, Some(JPEG)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.headers().get("Access-Control-Allow-Origin").unwrap(),
        "*"
    );
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], error_codes::TOKEN_MISSING);

    let req = test::TestRequest::get()
        .uri("/search?lat=40.0&lon=-73.0")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_token_from_other_key_rejected() {
    let app = init_app!(state());
    let foreign = SessionKeys::new("some-other-deployment-secret-0123456789")
        .unwrap()
        .issue("bob")
        .unwrap();

    let resp = test::call_service(&app, search_req(&foreign, "lat=40.0&lon=-73.0").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], error_codes::TOKEN_INVALID);
}

#[actix_web::test]
async fn test_health() {
    let app = init_app!(state());
    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("Access-Control-Allow-Headers").unwrap(),
        "Content-Type,Authorization"
    );
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "status": "ok" }));
}
