// Relay straight into the object store through a server-minted signed URL

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header::CONTENT_TYPE, Client};
use tracing::{info, warn};
use uuid::Uuid;

use super::{IncomingFile, RelayError, RelayTarget, StoredFile};
use crate::config::RelayTargetKind;
use crate::storage::SignedUrlIssuer;
use crate::utils::naming::{epoch_millis, relay_object_name};

pub struct BucketRelay {
    issuer: Arc<dyn SignedUrlIssuer>,
    client: Client,
    ttl: Duration,
}

impl BucketRelay {
    pub fn new(
        issuer: Arc<dyn SignedUrlIssuer>,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Self, RelayError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { issuer, client, ttl })
    }
}

#[async_trait]
impl RelayTarget for BucketRelay {
    fn kind(&self) -> RelayTargetKind {
        RelayTargetKind::Bucket
    }

    async fn relay(&self, file: IncomingFile) -> Result<StoredFile, RelayError> {
        let object_name = relay_object_name(&file.original_name, epoch_millis(), Uuid::new_v4());
        let mime_type = file.content_type_or_default().to_string();

        let signed_url = self
            .issuer
            .signed_put_url(&object_name, Some(&mime_type), self.ttl)
            .await?;

        info!(
            original = %file.original_name,
            object = %object_name,
            bytes = file.data.len(),
            provider = self.issuer.provider(),
            "Relaying file to bucket"
        );

        let response = self
            .client
            .put(&signed_url)
            .header(CONTENT_TYPE, &mime_type)
            .body(file.data)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(object = %object_name, status = status.as_u16(), "Bucket rejected upload");
            return Err(RelayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // The object URL is the signed URL minus its signature
        let url = signed_url
            .split_once('?')
            .map(|(base, _)| base.to_string())
            .unwrap_or(signed_url);

        Ok(StoredFile {
            name: object_name.clone(),
            url,
            id: object_name,
            mime_type,
            date_created: Utc::now().to_rfc3339(),
        })
    }
}
