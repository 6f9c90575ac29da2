//! Cryptographic primitives shared by the services.
//!
//! - `jwt`: session token issue and verification (HS256)
//! - `password`: argon2id password hashing

pub mod jwt;
pub mod password;

pub use jwt::{Claims, SessionKeys, TokenError};
pub use password::{hash_password, verify_password, PasswordError};
