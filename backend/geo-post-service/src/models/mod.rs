/// Data models for geo-post-service
pub mod distance;

pub use distance::{Distance, DistanceError, DistanceUnit};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean earth radius in meters, as used by Elasticsearch geo_distance
pub const EARTH_MEAN_RADIUS_METERS: f64 = 6_371_008.7714;

// ============================================================================
// Location
// ============================================================================

/// A WGS84 point, serialized as `{"lat": .., "lon": ..}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum LocationError {
    #[error("missing {0} parameter")]
    Missing(&'static str),

    #[error("{field} is not a number: {value:?}")]
    Malformed { field: &'static str, value: String },

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Result<Self, LocationError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(LocationError::OutOfRange { field: "lat", value: lat });
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(LocationError::OutOfRange { field: "lon", value: lon });
        }
        Ok(Self { lat, lon })
    }

    /// Parse a location from raw form or query values
    pub fn parse(lat: Option<&str>, lon: Option<&str>) -> Result<Self, LocationError> {
        let lat = parse_coordinate("lat", lat)?;
        let lon = parse_coordinate("lon", lon)?;
        Self::new(lat, lon)
    }

    /// Great-circle distance in meters (haversine)
    pub fn distance_meters(&self, other: &Location) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_MEAN_RADIUS_METERS * a.sqrt().min(1.0).asin()
    }
}

fn parse_coordinate(field: &'static str, raw: Option<&str>) -> Result<f64, LocationError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(LocationError::Missing(field))?;

    raw.parse::<f64>().map_err(|_| LocationError::Malformed {
        field,
        value: raw.to_string(),
    })
}

// ============================================================================
// Post
// ============================================================================

/// A geo-tagged post as stored in the index and returned by search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub user: String,
    pub message: String,
    pub location: Location,
    pub url: String,
}

// ============================================================================
// User
// ============================================================================

/// Stored account record. Only the Argon2id hash of the password is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub age: i64,
    #[serde(default)]
    pub gender: String,
}

/// POST /signup body
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub age: i64,
    #[serde(default)]
    pub gender: String,
}

/// POST /login body
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// GET /search query string. Values are kept raw so parse failures map to
/// our own error body rather than the extractor's.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub range: Option<String>,
}
