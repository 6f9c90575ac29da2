/// HTTP request handlers
pub mod auth;
pub mod posts;

pub use auth::{login, signup};
pub use posts::{create_post, search};

use actix_web::HttpResponse;

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}
