//! Geo Post Service
//!
//! Users sign up, log in for a session token, publish posts that carry an image
//! and a location, and search for posts around a point. Posts live in a
//! geo-capable search index; images live in a blob store.

pub mod app_state;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;

// Public re-exports
pub use app_state::{AppState, Backends};
pub use config::Config;
pub use error::{AppError, Result};
