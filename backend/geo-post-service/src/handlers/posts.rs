use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::models::{Distance, Location, SearchQuery};
use crate::services::{MediaUpload, PostForm};
use actix_middleware::AuthenticatedUser;
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use bytes::{Bytes, BytesMut};
use futures_util::stream::StreamExt;
use serde_json::json;
use tracing::{debug, info};

const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// POST /post
///
/// The owner is always the token's username; the form has no user field.
pub async fn create_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payload: Multipart,
) -> Result<HttpResponse> {
    let form = read_post_form(payload, state.max_upload_bytes).await?;
    let saved = state.ingestion.ingest(user.username(), form).await?;

    Ok(HttpResponse::Ok().json(json!({ "id": saved.id, "url": saved.post.url })))
}

/// GET /search
pub async fn search(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let center = Location::parse(query.lat.as_deref(), query.lon.as_deref())?;
    let radius = match query.range.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => raw.parse::<Distance>()?,
        None => state.default_range,
    };

    let posts = state.index.search_within_radius(center, radius).await?;
    info!(
        user = %user.username(),
        lat = center.lat,
        lon = center.lon,
        range = %radius,
        hits = posts.len(),
        "Search completed"
    );

    Ok(HttpResponse::Ok().json(posts))
}

async fn read_post_form(mut payload: Multipart, max_upload_bytes: usize) -> Result<PostForm> {
    let mut form = PostForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "image" => {
                let content_type = field.content_type().map(|m| m.essence_str().to_string());
                let bytes = read_field(&mut field, max_upload_bytes)
                    .await?
                    .ok_or(AppError::UploadTooLarge(max_upload_bytes))?;
                form.media = Some(MediaUpload::new(bytes, content_type.as_deref()));
            }
            "lat" | "lon" | "message" => {
                let bytes = read_field(&mut field, MAX_TEXT_FIELD_BYTES)
                    .await?
                    .ok_or_else(|| AppError::BadRequest(format!("field {name} is too large")))?;
                let value = String::from_utf8(bytes.to_vec()).map_err(|_| {
                    AppError::BadRequest(format!("field {name} is not valid UTF-8"))
                })?;
                match name.as_str() {
                    "lat" => form.lat = Some(value),
                    "lon" => form.lon = Some(value),
                    _ => form.message = value,
                }
            }
            other => {
                debug!(field = %other, "Ignoring unknown form field");
                while let Some(chunk) = field.next().await {
                    chunk?;
                }
            }
        }
    }

    Ok(form)
}

/// Collect a field's bytes, or `None` once it grows past `limit`
async fn read_field(field: &mut Field, limit: usize) -> Result<Option<Bytes>> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > limit {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Some(buf.freeze()))
}
