//! Google Cloud Storage V4 signed URLs
//!
//! Produces `GOOG4-RSA-SHA256` query-string signatures with a service
//! account key, so no call to Google is needed to mint a URL.
//!
//! The signature covers:
//! - the HTTP verb and the `/{bucket}/{object}` path
//! - the sorted `X-Goog-*` query parameters
//! - the `host` header and, when given, `content-type`
//!
//! Payloads are never hashed (`UNSIGNED-PAYLOAD`).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rsa::{
    pkcs1::DecodeRsaPrivateKey,
    pkcs1v15::SigningKey,
    pkcs8::DecodePrivateKey,
    signature::{SignatureEncoding, Signer},
    RsaPrivateKey,
};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{check_request, SignedUrlIssuer, StorageError};

pub const GCS_HOST: &str = "storage.googleapis.com";
const ALGORITHM: &str = "GOOG4-RSA-SHA256";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

pub struct GcsSigner {
    client_email: String,
    bucket: String,
    host: String,
    key: SigningKey<Sha256>,
}

impl GcsSigner {
    pub fn new(client_email: &str, bucket: &str, key: RsaPrivateKey) -> Self {
        Self {
            client_email: client_email.to_string(),
            bucket: bucket.to_string(),
            host: GCS_HOST.to_string(),
            key: SigningKey::<Sha256>::new(key),
        }
    }

    /// Accepts PKCS#8 (`BEGIN PRIVATE KEY`, what service account JSON files
    /// carry) and falls back to PKCS#1 (`BEGIN RSA PRIVATE KEY`).
    pub fn from_pem(client_email: &str, bucket: &str, pem: &str) -> Result<Self, StorageError> {
        let pem = pem.trim();
        if pem.is_empty() {
            return Err(StorageError::Misconfigured("GCP_PRIVATE_KEY is empty".to_string()));
        }

        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| StorageError::InvalidKey(e.to_string()))?;

        Ok(Self::new(client_email, bucket, key))
    }

    /// Point the signer at another host, e.g. a storage emulator.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Sign a `PUT` for `object_name` as of `now`.
    pub fn sign_put_at(
        &self,
        object_name: &str,
        content_type: Option<&str>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        let expires = check_request(object_name, ttl)?;

        let datestamp = now.format("%Y%m%d").to_string();
        let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        let scope = format!("{}/auto/storage/goog4_request", datestamp);
        let credential = format!("{}/{}", self.client_email, scope);

        let mut headers: Vec<(&str, String)> = vec![("host", self.host.clone())];
        if let Some(ct) = content_type.map(str::trim).filter(|ct| !ct.is_empty()) {
            headers.push(("content-type", ct.to_string()));
        }
        headers.sort_by(|a, b| a.0.cmp(b.0));

        let signed_headers = headers
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(";");
        let canonical_headers: String = headers
            .iter()
            .map(|(name, value)| format!("{}:{}\n", name, value))
            .collect();

        let mut query = vec![
            ("X-Goog-Algorithm", ALGORITHM.to_string()),
            ("X-Goog-Credential", credential),
            ("X-Goog-Date", timestamp.clone()),
            ("X-Goog-Expires", expires.to_string()),
            ("X-Goog-SignedHeaders", signed_headers.clone()),
        ];
        query.sort_by(|a, b| a.0.cmp(b.0));
        let canonical_query = query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_uri = format!("/{}/{}", self.bucket, encode_object_path(object_name));

        let canonical_request = [
            "PUT",
            canonical_uri.as_str(),
            canonical_query.as_str(),
            canonical_headers.as_str(),
            signed_headers.as_str(),
            UNSIGNED_PAYLOAD,
        ]
        .join("\n");

        let string_to_sign = string_to_sign(&timestamp, &scope, &canonical_request);
        let signature = self
            .key
            .try_sign(string_to_sign.as_bytes())
            .map_err(|e| StorageError::Signing(e.to_string()))?;

        debug!(object = %object_name, expires, "Signed GCS write URL");

        Ok(format!(
            "https://{}{}?{}&X-Goog-Signature={}",
            self.host,
            canonical_uri,
            canonical_query,
            hex::encode(signature.to_bytes())
        ))
    }
}

#[async_trait]
impl SignedUrlIssuer for GcsSigner {
    fn provider(&self) -> &'static str {
        "gcs"
    }

    async fn signed_put_url(
        &self,
        object_name: &str,
        content_type: Option<&str>,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        self.sign_put_at(object_name, content_type, ttl, Utc::now())
    }
}

// =============================================================================
// Canonical form helpers
// =============================================================================

fn string_to_sign(timestamp: &str, scope: &str, canonical_request: &str) -> String {
    let digest = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    format!("{}\n{}\n{}\n{}", ALGORITHM, timestamp, scope, digest)
}

/// Percent-encode each path segment, keeping the `/` separators.
fn encode_object_path(object_name: &str) -> String {
    object_name
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
