//! # Actix Middleware Library
//!
//! Middleware components shared by the actix-web services
//!
//! ## Modules
//! - `jwt_auth`: bearer session token authentication
//! - `logging`: request id assignment and request/response logging

pub mod jwt_auth;
pub mod logging;

pub use jwt_auth::{AuthenticatedUser, JwtAuthMiddleware};
pub use logging::{RequestId, RequestLogging};
