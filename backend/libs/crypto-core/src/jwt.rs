/// Session token issue and verification
///
/// Tokens are HS256 JWTs carrying the username and an expiry. They are not
/// persisted anywhere: a token is valid if and only if its signature verifies
/// against one of the configured keys and it has not expired.
///
/// ## Key rotation
///
/// A [`SessionKeys`] holds exactly one *active* secret, used for signing and
/// verification, plus any number of *retired* secrets that are accepted for
/// verification only. Rotating a key means moving the current secret into the
/// retired list and configuring a new active one; tokens signed with the old
/// key stay valid until they expire, then the retired entry can be dropped.
///
/// ## Usage
///
/// ```rust
/// use crypto_core::jwt::SessionKeys;
///
/// let keys = SessionKeys::new("0123456789abcdef0123456789abcdef-demo").unwrap();
/// let token = keys.issue("alice").unwrap();
/// let claims = keys.verify(&token).unwrap();
/// assert_eq!(claims.username, "alice");
/// ```
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

const SESSION_TOKEN_TTL_HOURS: i64 = 24;

/// Minimum secret length for HMAC keys (256 bits)
pub const MIN_SECRET_LENGTH: usize = 32;

/// Symmetric signing; the verifier pins the algorithm so a token cannot pick its own.
const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

// ============================================================================
// Data Structures
// ============================================================================

/// Claims carried by a session token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Authenticated username
    pub username: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("signing secret must be at least {MIN_SECRET_LENGTH} bytes")]
    WeakSecret,

    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Signing and verification keys for session tokens
#[derive(Clone)]
pub struct SessionKeys {
    encoding_key: EncodingKey,
    /// Active key first, then retired keys in configuration order
    decoding_keys: Vec<DecodingKey>,
    ttl: Duration,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("verification_keys", &self.decoding_keys.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionKeys {
    /// Create keys from the active secret, with the default 24h token lifetime
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        check_secret(secret)?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_keys: vec![DecodingKey::from_secret(secret.as_bytes())],
            ttl: Duration::hours(SESSION_TOKEN_TTL_HOURS),
        })
    }

    /// Accept tokens signed with retired secrets during a rotation window
    pub fn with_retired_secrets<I, S>(mut self, secrets: I) -> Result<Self, TokenError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for secret in secrets {
            let secret = secret.as_ref();
            check_secret(secret)?;
            self.decoding_keys
                .push(DecodingKey::from_secret(secret.as_bytes()));
        }
        Ok(self)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `username`, valid from now for the configured lifetime
    pub fn issue(&self, username: &str) -> Result<String, TokenError> {
        self.issue_at(username, Utc::now())
    }

    /// Issue a token as if it had been created at `issued_at`
    pub fn issue_at(&self, username: &str, issued_at: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            username: username.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and expiry, returning the embedded claims
    ///
    /// Keys are tried in order. A signature mismatch moves on to the next key;
    /// any other failure (expiry, malformed token) is final because it means
    /// the signature already matched or the token cannot be parsed at all.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;
        validation.leeway = 0;

        let mut last_error = TokenError::Invalid("no verification key configured".into());
        for key in &self.decoding_keys {
            match decode::<Claims>(token, key, &validation) {
                Ok(data) => return Ok(data.claims),
                Err(e) => match e.kind() {
                    ErrorKind::InvalidSignature => {
                        last_error = TokenError::Invalid(e.to_string());
                    }
                    ErrorKind::ExpiredSignature => return Err(TokenError::Expired),
                    _ => return Err(TokenError::Invalid(e.to_string())),
                },
            }
        }

        Err(last_error)
    }
}

fn check_secret(secret: &str) -> Result<(), TokenError> {
    if secret.len() < MIN_SECRET_LENGTH {
        return Err(TokenError::WeakSecret);
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
