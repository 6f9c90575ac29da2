use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error, HttpMessage, HttpResponse,
};
use crypto_core::jwt::{SessionKeys, TokenError};
use error_types::{error_codes, error_types as kinds, ErrorResponse};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

/// Username extracted from a verified session token
///
/// This is the only trusted source of identity for handlers behind
/// [`JwtAuthMiddleware`]; request bodies never override it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

impl AuthenticatedUser {
    pub fn username(&self) -> &str {
        &self.0
    }
}

/// JWT Authentication Middleware
///
/// Rejects the request with 401 before the handler runs when the
/// `Authorization: Bearer <token>` header is missing, malformed, carries a
/// bad signature or an expired token.
pub struct JwtAuthMiddleware {
    keys: Arc<SessionKeys>,
}

impl JwtAuthMiddleware {
    pub fn new(keys: Arc<SessionKeys>) -> Self {
        Self { keys }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = JwtAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            keys: self.keys.clone(),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    keys: Arc<SessionKeys>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        let username = match authenticate(&req, &self.keys) {
            Ok(username) => username,
            Err((code, message)) => {
                tracing::warn!(path = %req.path(), code, "session token rejected");
                let response = unauthorized(code, message);
                return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
            }
        };

        req.extensions_mut().insert(AuthenticatedUser(username));

        Box::pin(async move {
            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

fn authenticate(
    req: &ServiceRequest,
    keys: &SessionKeys,
) -> Result<String, (&'static str, &'static str)> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or((error_codes::TOKEN_MISSING, "Missing Authorization header"))?;

    // The auth scheme is case-insensitive: "Bearer", "bearer" and "BEARER" all match
    let token = auth_header
        .trim()
        .split_once(' ')
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
        .ok_or((
            error_codes::TOKEN_INVALID,
            "Authorization must use Bearer scheme",
        ))?;

    let claims = keys.verify(token).map_err(|e| match e {
        TokenError::Expired => (error_codes::TOKEN_EXPIRED, "Token expired"),
        other => {
            tracing::debug!("session token validation failed: {}", other);
            (error_codes::TOKEN_INVALID, "Invalid token")
        }
    })?;

    Ok(claims.username)
}

fn unauthorized(code: &str, message: &str) -> HttpResponse {
    let status = StatusCode::UNAUTHORIZED;
    HttpResponse::build(status).json(ErrorResponse::new(
        "Unauthorized",
        message,
        status.as_u16(),
        kinds::AUTHENTICATION_ERROR,
        code,
    ))
}

/// FromRequest implementation for AuthenticatedUser
impl actix_web::FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(actix_web::error::ErrorUnauthorized(
                "User not authenticated",
            ))),
        }
    }
}
