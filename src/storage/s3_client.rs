// S3-compatible presigned uploads (AWS, MinIO, R2, ...)

use std::time::Duration;

use async_trait::async_trait;
use s3::{creds::Credentials, Bucket, Region};
use tracing::debug;

use super::{check_request, SignedUrlIssuer, StorageError};
use crate::config::StorageConfig;

pub struct S3Signer {
    bucket: Bucket,
}

impl S3Signer {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        if config.s3_bucket.is_empty() {
            return Err(StorageError::Misconfigured("S3_BUCKET is empty".to_string()));
        }

        let region = match &config.s3_endpoint {
            Some(endpoint) => Region::Custom {
                region: config.s3_region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .s3_region
                .parse()
                .map_err(|e| StorageError::Misconfigured(format!("S3_REGION: {}", e)))?,
        };

        let credentials = Credentials::new(
            config.s3_access_key_id.as_deref(),
            config.s3_secret_access_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Misconfigured(format!("S3 credentials: {}", e)))?;

        let mut bucket = Bucket::new(&config.s3_bucket, region, credentials)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        // Self-hosted endpoints rarely resolve virtual-host bucket names
        if config.s3_endpoint.is_some() {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket })
    }
}

#[async_trait]
impl SignedUrlIssuer for S3Signer {
    fn provider(&self) -> &'static str {
        "s3"
    }

    // Content type is left unsigned; S3 accepts whatever header the PUT carries.
    async fn signed_put_url(
        &self,
        object_name: &str,
        _content_type: Option<&str>,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        let expires = check_request(object_name, ttl)?;
        let expires = u32::try_from(expires).map_err(|_| StorageError::InvalidTtl(expires))?;

        let url = self
            .bucket
            .presign_put(format!("/{}", object_name), expires, None)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        debug!(object = %object_name, expires, "Presigned S3 write URL");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StorageProvider};

    fn s3_config() -> StorageConfig {
        let mut storage = Config::default().storage;
        storage.provider = StorageProvider::S3;
        storage.s3_bucket = "wedding-photos".to_string();
        storage.s3_access_key_id = Some("AKIDEXAMPLE".to_string());
        storage.s3_secret_access_key = Some("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string());
        storage.s3_endpoint = Some("http://localhost:9000".to_string());
        storage
    }

    #[test]
    fn test_requires_bucket() {
        let mut config = s3_config();
        config.s3_bucket.clear();
        assert!(matches!(S3Signer::new(&config), Err(StorageError::Misconfigured(_))));
    }

    #[tokio::test]
    async fn test_presigned_put_uses_path_style() {
        let signer = S3Signer::new(&s3_config()).unwrap();
        let url = signer
            .signed_put_url("1718476205000-cake.jpg", Some("image/jpeg"), Duration::from_secs(900))
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:9000/wedding-photos/1718476205000-cake.jpg?"));
        assert!(url.contains("X-Amz-Signature="));
        assert!(url.contains("X-Amz-Expires=900"));
        assert_eq!(signer.provider(), "s3");
    }

    #[tokio::test]
    async fn test_rejects_empty_object_name() {
        let signer = S3Signer::new(&s3_config()).unwrap();
        let result = signer.signed_put_url("", None, Duration::from_secs(900)).await;
        assert!(matches!(result, Err(StorageError::InvalidObjectName(_))));
    }
}
