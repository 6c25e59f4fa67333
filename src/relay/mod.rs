//! Server-side upload relay
//!
//! When a client cannot reach the bucket directly it posts the file to
//! `/api/files` and the server forwards it, one file at a time, to:
//! - `script` - a spreadsheet-backed script web app ([`script::ScriptRelay`])
//! - `bucket` - the object store, through a server-minted signed URL
//!   ([`bucket::BucketRelay`])

pub mod bucket;
pub mod script;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{RelayConfig, RelayTargetKind};
use crate::storage::{SignedUrlIssuer, StorageError};

pub use bucket::BucketRelay;
pub use script::ScriptRelay;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("relay target is not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream rejected the file: {0}")]
    Rejected(String),

    #[error("unexpected upstream response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// One file received by the broker.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl IncomingFile {
    pub fn new(original_name: impl Into<String>, content_type: Option<String>, data: Bytes) -> Self {
        Self {
            original_name: original_name.into(),
            content_type: content_type.filter(|ct| !ct.trim().is_empty()),
            data,
        }
    }

    pub fn content_type_or_default(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

/// Where a relayed file ended up. Matches the script service's file record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub name: String,
    pub url: String,
    pub id: String,
    pub mime_type: String,
    pub date_created: String,
}

#[async_trait]
pub trait RelayTarget: Send + Sync {
    fn kind(&self) -> RelayTargetKind;

    async fn relay(&self, file: IncomingFile) -> Result<StoredFile, RelayError>;
}

/// Relay handles built from configuration.
pub struct RelayHandles {
    pub target: Option<Arc<dyn RelayTarget>>,
    pub script: Option<Arc<ScriptRelay>>,
}

pub fn build_relay(
    config: &RelayConfig,
    issuer: Arc<dyn SignedUrlIssuer>,
    signed_url_ttl: Duration,
) -> Result<RelayHandles, RelayError> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let script = match &config.script_url {
        Some(url) => Some(Arc::new(ScriptRelay::new(url, timeout)?)),
        None => None,
    };

    let target: Option<Arc<dyn RelayTarget>> = match config.target {
        RelayTargetKind::Script => script
            .clone()
            .map(|s| s as Arc<dyn RelayTarget>),
        RelayTargetKind::Bucket => Some(Arc::new(BucketRelay::new(issuer, signed_url_ttl, timeout)?)),
    };

    Ok(RelayHandles { target, script })
}
