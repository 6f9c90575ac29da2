/// Configuration management for geo-post-service
///
/// Loads configuration from environment variables with sensible defaults.
/// `JWT_SECRET` is the only required value.
use crate::models::Distance;
use chrono::Duration;
use crypto_core::jwt::{SessionKeys, TokenError};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("invalid JWT configuration: {0}")]
    Jwt(#[from] TokenError),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppConfig,
    pub backend: BackendMode,
    pub elasticsearch: ElasticsearchConfig,
    pub gcs: GcsConfig,
    pub auth: AuthConfig,
    pub posts: PostsConfig,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: String,
}

/// Which backend implementations to run against
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendMode {
    Elasticsearch,
    Memory,
}

impl FromStr for BackendMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elasticsearch" | "es" => Ok(BackendMode::Elasticsearch),
            "memory" | "in-memory" => Ok(BackendMode::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub post_index: String,
    pub user_index: String,
}

#[derive(Clone, Debug)]
pub struct GcsConfig {
    pub bucket: String,
    pub host: String,
    pub service_account_json: Option<String>,
    pub service_account_json_path: Option<String>,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Retired signing secrets, accepted for verification only
    pub previous_secrets: Vec<String>,
    pub token_ttl_hours: i64,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("previous_secrets", &self.previous_secrets.len())
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish()
    }
}

impl AuthConfig {
    pub fn session_keys(&self) -> Result<SessionKeys, TokenError> {
        Ok(SessionKeys::new(&self.jwt_secret)?
            .with_retired_secrets(&self.previous_secrets)?
            .with_ttl(Duration::hours(self.token_ttl_hours)))
    }
}

#[derive(Clone, Debug)]
pub struct PostsConfig {
    /// Radius used by search when the request has no `range`
    pub default_range: Distance,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let backend = parse_var(&lookup, "BACKEND_MODE", BackendMode::Elasticsearch)?;

        let auth = AuthConfig {
            jwt_secret: lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            previous_secrets: lookup("JWT_PREVIOUS_SECRETS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim())
                        .filter(|s| !s.is_empty())
                        .map(|s| s.to_string())
                        .collect()
                })
                .unwrap_or_default(),
            token_ttl_hours: parse_var(&lookup, "JWT_TTL_HOURS", 24)?,
        };
        if auth.token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "JWT_TTL_HOURS",
                value: auth.token_ttl_hours.to_string(),
            });
        }
        // Fail at startup rather than on first login
        auth.session_keys()?;

        let default_range_km: f64 = parse_var(&lookup, "DEFAULT_SEARCH_RANGE_KM", 200.0)?;
        if !default_range_km.is_finite() || default_range_km <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_SEARCH_RANGE_KM",
                value: default_range_km.to_string(),
            });
        }

        Ok(Config {
            app: AppConfig {
                host: var("SERVICE_HOST", "0.0.0.0"),
                port: parse_var(&lookup, "SERVICE_PORT", 8080)?,
                env: var("APP_ENV", "development"),
            },
            backend,
            elasticsearch: ElasticsearchConfig {
                url: var("ELASTICSEARCH_URL", "http://localhost:9200"),
                post_index: var("ELASTICSEARCH_POST_INDEX", "post"),
                user_index: var("ELASTICSEARCH_USER_INDEX", "user"),
            },
            gcs: GcsConfig {
                bucket: var("GCS_BUCKET", "around-bucket"),
                host: var("GCS_HOST", "storage.googleapis.com"),
                service_account_json: lookup("GCS_SERVICE_ACCOUNT_JSON"),
                service_account_json_path: lookup("GCS_SERVICE_ACCOUNT_JSON_PATH"),
            },
            auth,
            posts: PostsConfig {
                default_range: Distance::kilometers(default_range_km),
                max_upload_bytes: parse_var(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            },
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
