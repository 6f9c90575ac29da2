use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::models::{LoginRequest, SignupRequest};
use actix_web::{http::header::ContentType, web, HttpResponse};
use tracing::{info, warn};

/// POST /signup
pub async fn signup(
    state: web::Data<AppState>,
    body: web::Json<SignupRequest>,
) -> Result<HttpResponse> {
    let candidate = body.into_inner();
    let username = candidate.username.clone();

    state.accounts.register_user(candidate).await.map_err(|e| {
        warn!(username = %username, error = %e, "Signup rejected");
        AppError::from(e)
    })?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body("User added successfully."))
}

/// POST /login
///
/// Responds with the session token as a plain text body.
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let LoginRequest { username, password } = body.into_inner();

    state
        .accounts
        .verify_credentials(&username, &password)
        .await
        .map_err(|e| {
            warn!(username = %username, error = %e, "Login failed");
            AppError::from(e)
        })?;

    let token = state
        .session_keys
        .issue(&username)
        .map_err(|e| AppError::Internal(format!("Failed to generate token: {e}")))?;

    info!(username = %username, "Login succeeded");
    Ok(HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(token))
}
