//! GCS blob store
//!
//! Objects are written through V4 signed URLs using the service account key, so
//! no OAuth token exchange is needed. Uploads carry `x-goog-acl: public-read`
//! as a signed header, which makes the object readable at its public URL.

use super::blob_store::{BlobStore, MediaUpload, StorageError};
use crate::config::GcsConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, StatusCode};
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};
use std::fs;
use std::time::Duration;
use tracing::{debug, info};

/// Characters that must be percent-encoded in the path component
const PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const SIGNED_URL_TTL: Duration = Duration::from_secs(300);
const PUBLIC_READ_ACL: &str = "public-read";

#[derive(serde::Deserialize)]
struct ServiceAccount {
    client_email: String,
    private_key: String,
}

pub struct GcsBlobStore {
    client_email: String,
    private_key: RsaPrivateKey,
    scheme: String,
    host: String,
    http_client: Client,
}

/// Split a configured host into scheme and authority. A bare host means https;
/// emulators are addressed as `http://host:port`.
fn split_endpoint(endpoint: &str) -> (&str, &str) {
    let endpoint = endpoint.trim_end_matches('/');
    match endpoint.split_once("://") {
        Some((scheme, authority)) => (scheme, authority),
        None => ("https", endpoint),
    }
}

fn object_url(scheme: &str, host: &str, bucket: &str, object_id: &str) -> String {
    format!(
        "{scheme}://{host}/{bucket}/{}",
        utf8_percent_encode(object_id.trim_start_matches('/'), PATH_SET)
    )
}

impl GcsBlobStore {
    /// Create a store from raw service account JSON
    pub fn new(service_account_json: &str, host: &str) -> Result<Self, StorageError> {
        let sa: ServiceAccount = serde_json::from_str(service_account_json)
            .map_err(|e| StorageError::Backend(format!("Invalid service account JSON: {e}")))?;

        let private_key = RsaPrivateKey::from_pkcs8_pem(&sa.private_key).map_err(|e| {
            StorageError::Backend(format!("Failed to parse service account private key: {e}"))
        })?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| StorageError::Backend(format!("Failed to create HTTP client: {e}")))?;

        let (scheme, authority) = split_endpoint(host);
        info!(client_email = %sa.client_email, host = %authority, scheme = %scheme, "GCS blob store initialized");

        Ok(Self {
            client_email: sa.client_email,
            private_key,
            scheme: scheme.to_string(),
            host: authority.to_string(),
            http_client,
        })
    }

    /// Create a store from configuration (inline JSON or a file path)
    pub fn from_config(cfg: &GcsConfig) -> Result<Self, StorageError> {
        let raw_json = if let Some(ref inline) = cfg.service_account_json {
            inline.clone()
        } else if let Some(ref path) = cfg.service_account_json_path {
            fs::read_to_string(path).map_err(|e| {
                StorageError::Backend(format!(
                    "Failed to read GCS service account JSON at {}: {e}",
                    path
                ))
            })?
        } else {
            return Err(StorageError::Backend(
                "GCS blob store requested but no service account JSON provided".into(),
            ));
        };

        Self::new(&raw_json, &cfg.host)
    }

    /// Permanent URL of a public-read object on the configured host
    pub fn public_url(&self, bucket: &str, object_id: &str) -> String {
        object_url(&self.scheme, &self.host, bucket, object_id)
    }

    fn sign_url(
        &self,
        method: &str,
        bucket: &str,
        object_id: &str,
        extra_headers: &[(&str, &str)],
        now: DateTime<Utc>,
    ) -> String {
        let datestamp = now.format("%Y%m%d").to_string();
        let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();

        let credential_scope = format!("{datestamp}/auto/storage/goog4_request");
        let credential = format!("{}/{}", self.client_email, credential_scope);

        let encoded_object =
            utf8_percent_encode(object_id.trim_start_matches('/'), PATH_SET).to_string();
        let canonical_uri = format!("/{bucket}/{encoded_object}");

        // Canonical headers are lowercase and sorted by name
        let mut headers: Vec<(String, String)> = vec![("host".to_string(), self.host.clone())];
        headers.extend(
            extra_headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string())),
        );
        headers.sort();
        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{k}:{v}\n"))
            .collect();
        let signed_headers = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let mut query_items = vec![
            ("X-Goog-Algorithm", "GOOG4-RSA-SHA256".to_string()),
            (
                "X-Goog-Credential",
                urlencoding::encode(&credential).into_owned(),
            ),
            ("X-Goog-Date", timestamp.clone()),
            ("X-Goog-Expires", SIGNED_URL_TTL.as_secs().to_string()),
            (
                "X-Goog-SignedHeaders",
                urlencoding::encode(&signed_headers).into_owned(),
            ),
        ];

        query_items.sort_by(|a, b| a.0.cmp(b.0));
        let canonical_query = query_items
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\nUNSIGNED-PAYLOAD"
        );
        let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));

        let string_to_sign =
            format!("GOOG4-RSA-SHA256\n{timestamp}\n{credential_scope}\n{canonical_hash}");

        let signing_key = SigningKey::<Sha256>::new(self.private_key.clone());
        let signature = signing_key.sign(string_to_sign.as_bytes()).to_bytes();
        let signature_hex = hex::encode(signature);

        format!(
            "{scheme}://{host}{canonical_uri}?{canonical_query}&X-Goog-Signature={signature_hex}",
            scheme = self.scheme,
            host = self.host
        )
    }
}

fn status_error(status: StatusCode, bucket: &str, body: String) -> StorageError {
    match status {
        StatusCode::NOT_FOUND => StorageError::BucketNotFound(bucket.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StorageError::PermissionDenied(format!("status {status}: {body}"))
        }
        _ => StorageError::Write(format!("status {status}: {body}")),
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn upload(
        &self,
        bucket: &str,
        object_id: &str,
        media: MediaUpload,
    ) -> Result<String, StorageError> {
        let signed_url = self.sign_url(
            "PUT",
            bucket,
            object_id,
            &[("x-goog-acl", PUBLIC_READ_ACL)],
            Utc::now(),
        );

        debug!(bucket = %bucket, object_id = %object_id, bytes = media.len(), "Uploading to GCS");

        let response = self
            .http_client
            .put(&signed_url)
            .header("x-goog-acl", PUBLIC_READ_ACL)
            .header(reqwest::header::CONTENT_TYPE, media.content_type)
            .body(media.bytes)
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("GCS upload failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, bucket, body));
        }

        Ok(self.public_url(bucket, object_id))
    }

    async fn delete(&self, bucket: &str, object_id: &str) -> Result<(), StorageError> {
        let signed_url = self.sign_url("DELETE", bucket, object_id, &[], Utc::now());

        let response = self
            .http_client
            .delete(&signed_url)
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("GCS delete failed: {e}")))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, bucket, body))
    }
}
