use crate::error::AppError;
use crate::handlers;
use actix_middleware::JwtAuthMiddleware;
use actix_web::{middleware::DefaultHeaders, web};
use crypto_core::jwt::SessionKeys;
use std::sync::Arc;

/// Headers attached to every response, including errors and auth rejections
pub fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add(("Access-Control-Allow-Headers", "Content-Type,Authorization"))
}

/// Register routes. `/post` and `/search` require a bearer token.
pub fn configure(cfg: &mut web::ServiceConfig, session_keys: Arc<SessionKeys>) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .route("/health", web::get().to(handlers::health))
        .route("/signup", web::post().to(handlers::signup))
        .route("/login", web::post().to(handlers::login))
        .service(
            web::resource("/post")
                .route(web::post().to(handlers::create_post))
                .wrap(JwtAuthMiddleware::new(session_keys.clone())),
        )
        .service(
            web::resource("/search")
                .route(web::get().to(handlers::search))
                .wrap(JwtAuthMiddleware::new(session_keys)),
        );
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .content_type_required(false)
        .error_handler(|err, _req| {
            AppError::BadRequest(format!("Failed to parse JSON input from client: {err}")).into()
        })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Failed to parse query string: {err}")).into()
    })
}
