//! Account registration and credential verification
//!
//! Passwords are hashed with Argon2id before they reach the store. Hashing and
//! verification are CPU bound, so both run on the blocking thread pool.

use crate::models::{SignupRequest, User};
use crate::validators;
use async_trait::async_trait;
use crypto_core::password::{hash_password, verify_password, PasswordError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("invalid username or password")]
    InvalidInput,

    #[error("user already exists: {0}")]
    AlreadyExists(String),

    #[error("wrong username or password")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("credential backend error: {0}")]
    Backend(String),
}

/// Persistent user records
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// All records stored under `username`. Callers must not assume at most one.
    async fn find_by_username(&self, username: &str) -> Result<Vec<User>, CredentialError>;

    /// Persist `user` unless a record with the same username exists, in which
    /// case [`CredentialError::AlreadyExists`] is returned. The check and the
    /// write are atomic in the backing store.
    async fn insert_if_absent(&self, user: &User) -> Result<(), CredentialError>;

    async fn exists(&self, username: &str) -> Result<bool, CredentialError> {
        Ok(self
            .find_by_username(username)
            .await?
            .iter()
            .any(|user| user.username == username))
    }
}

/// Signup and login logic on top of a [`CredentialStore`]
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn CredentialStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Validate and store a new account. No session is issued.
    pub async fn register_user(&self, candidate: SignupRequest) -> Result<(), CredentialError> {
        if !validators::validate_signup(&candidate.username, &candidate.password) {
            return Err(CredentialError::InvalidInput);
        }

        if self.store.exists(&candidate.username).await? {
            return Err(CredentialError::AlreadyExists(candidate.username));
        }

        let password = candidate.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| CredentialError::Hashing(e.to_string()))?
            .map_err(|e| CredentialError::Hashing(e.to_string()))?;

        let user = User {
            username: candidate.username,
            password_hash,
            age: candidate.age,
            gender: candidate.gender,
        };

        self.store.insert_if_absent(&user).await?;
        info!(username = %user.username, "User registered");
        Ok(())
    }

    /// Succeeds when some record for `username` verifies against `password`.
    /// Unknown users and wrong passwords fail identically.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(), CredentialError> {
        let candidates: Vec<User> = self
            .store
            .find_by_username(username)
            .await?
            .into_iter()
            .filter(|user| user.username == username)
            .collect();

        for user in candidates {
            let password = password.to_string();
            let stored = user.password_hash;
            let outcome = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
                .await
                .map_err(|e| CredentialError::Hashing(e.to_string()))?;

            match outcome {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(PasswordError::MalformedHash(e)) => {
                    warn!(username = %username, error = %e, "Stored password hash is unreadable");
                }
                Err(e) => return Err(CredentialError::Hashing(e.to_string())),
            }
        }

        Err(CredentialError::InvalidCredentials)
    }
}
