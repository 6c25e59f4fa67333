use std::sync::Arc;
use std::time::Duration;

use governor::DefaultDirectRateLimiter;
use validator::Validate;

use crate::config::Config;
use crate::middleware::build_limiter;
use crate::relay::{build_relay, RelayTarget, ScriptRelay, StoredFile};
use crate::storage::{build_issuer_or_unconfigured, SignedUrlIssuer};
use crate::types::UploadStatus;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub issuer: Arc<dyn SignedUrlIssuer>,
    pub relay: Option<Arc<dyn RelayTarget>>,
    pub script: Option<Arc<ScriptRelay>>,
    pub limiter: Arc<DefaultDirectRateLimiter>,
}

impl AppState {
    /// Wire storage and relay handles from configuration.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let issuer = build_issuer_or_unconfigured(&config.storage);
        let relay = build_relay(
            &config.relay,
            issuer.clone(),
            Duration::from_secs(config.storage.signed_url_ttl_secs),
        )?;

        Ok(Self::new(config, issuer, relay.target, relay.script))
    }

    pub fn new(
        config: Config,
        issuer: Arc<dyn SignedUrlIssuer>,
        relay: Option<Arc<dyn RelayTarget>>,
        script: Option<Arc<ScriptRelay>>,
    ) -> Self {
        let limiter = build_limiter(config.server.rate_limit_per_second);
        Self {
            config: Arc::new(config),
            issuer,
            relay,
            script,
            limiter,
        }
    }

    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.config.storage.signed_url_ttl_secs)
    }
}

// API Request/Response types

/// Body of `POST /api/generatePutUrl`.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlRequest {
    #[serde(default)]
    #[validate(length(max = 1024))]
    pub filename: Option<String>,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub content_type: Option<String>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct SignedUrlResponse {
    pub url: String,
}

/// Result for one file posted to `/api/files`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FileUploadOutcome {
    pub success: bool,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file: Option<StoredFile>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl FileUploadOutcome {
    pub fn stored(name: impl Into<String>, file: StoredFile) -> Self {
        Self {
            success: true,
            name: name.into(),
            file: Some(file),
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            name: name.into(),
            file: None,
            error: Some(error.into()),
        }
    }

    pub fn status(&self) -> UploadStatus {
        if self.success {
            UploadStatus::Success
        } else {
            UploadStatus::Failure
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub storage_provider: String,
    pub relay_target: Option<String>,
    pub script_configured: bool,
}
