//! Object storage access
//!
//! Guests never talk to the bucket with our credentials. Instead the server
//! mints short-lived signed `PUT` URLs that a client (or the bucket relay)
//! uses directly.
//!
//! - [`gcs::GcsSigner`] - Google Cloud Storage V4 signatures (RSA-SHA256)
//! - [`s3_client::S3Signer`] - S3-compatible presigned URLs

pub mod gcs;
pub mod s3_client;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{StorageConfig, StorageProvider, MAX_SIGNED_URL_TTL_SECS};

pub use gcs::GcsSigner;
pub use s3_client::S3Signer;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage is not configured: {0}")]
    Misconfigured(String),

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("invalid object name: {0}")]
    InvalidObjectName(String),

    #[error("signed URL lifetime must be between 1 and 604800 seconds, got {0}")]
    InvalidTtl(u64),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Issues write URLs for a single bucket.
#[async_trait]
pub trait SignedUrlIssuer: Send + Sync {
    /// Short provider name for health output and logs.
    fn provider(&self) -> &'static str;

    /// Returns a URL accepting one `PUT` of `object_name` until `ttl` elapses.
    ///
    /// When `content_type` is given the uploader must send the same
    /// `Content-Type` header.
    async fn signed_put_url(
        &self,
        object_name: &str,
        content_type: Option<&str>,
        ttl: Duration,
    ) -> Result<String, StorageError>;
}

/// Stands in when credentials are missing so the relay routes keep serving.
pub struct UnconfiguredIssuer {
    reason: String,
}

impl UnconfiguredIssuer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl SignedUrlIssuer for UnconfiguredIssuer {
    fn provider(&self) -> &'static str {
        "unconfigured"
    }

    async fn signed_put_url(
        &self,
        _object_name: &str,
        _content_type: Option<&str>,
        _ttl: Duration,
    ) -> Result<String, StorageError> {
        Err(StorageError::Misconfigured(self.reason.clone()))
    }
}

/// Validate the parts every provider agrees on.
pub(crate) fn check_request(object_name: &str, ttl: Duration) -> Result<u64, StorageError> {
    if object_name.trim().is_empty() {
        return Err(StorageError::InvalidObjectName("name is empty".to_string()));
    }
    if object_name.len() > 1024 {
        return Err(StorageError::InvalidObjectName(format!(
            "name is {} bytes, limit is 1024",
            object_name.len()
        )));
    }
    if object_name.contains(['\r', '\n']) {
        return Err(StorageError::InvalidObjectName(
            "name contains a line break".to_string(),
        ));
    }

    let secs = ttl.as_secs();
    if secs == 0 || secs > MAX_SIGNED_URL_TTL_SECS {
        return Err(StorageError::InvalidTtl(secs));
    }
    Ok(secs)
}

/// Build the issuer for the configured provider.
pub fn build_issuer(config: &StorageConfig) -> Result<Arc<dyn SignedUrlIssuer>, StorageError> {
    match config.provider {
        StorageProvider::Gcs => {
            if config.gcp_bucket_name.is_empty() {
                return Err(StorageError::Misconfigured("GCP_BUCKET_NAME is empty".to_string()));
            }
            if config.gcp_client_email.is_empty() {
                return Err(StorageError::Misconfigured("GCP_CLIENT_EMAIL is empty".to_string()));
            }
            let signer = GcsSigner::from_pem(
                &config.gcp_client_email,
                &config.gcp_bucket_name,
                &config.gcp_private_key,
            )?;
            info!(
                bucket = %config.gcp_bucket_name,
                project = %config.gcp_project_id,
                "Using Google Cloud Storage signer"
            );
            Ok(Arc::new(signer))
        }
        StorageProvider::S3 => {
            let signer = S3Signer::new(config)?;
            info!(bucket = %config.s3_bucket, region = %config.s3_region, "Using S3 signer");
            Ok(Arc::new(signer))
        }
    }
}

/// Like [`build_issuer`], but a broken storage setup only disables signing.
pub fn build_issuer_or_unconfigured(config: &StorageConfig) -> Arc<dyn SignedUrlIssuer> {
    match build_issuer(config) {
        Ok(issuer) => issuer,
        Err(e) => {
            warn!(error = %e, "Signed URLs disabled");
            Arc::new(UnconfiguredIssuer::new(e.to_string()))
        }
    }
}
