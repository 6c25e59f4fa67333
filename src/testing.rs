// Fakes shared by router tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;

use crate::config::{Config, RelayTargetKind};
use crate::models::AppState;
use crate::relay::{IncomingFile, RelayError, RelayTarget, StoredFile};
use crate::storage::{SignedUrlIssuer, StorageError};

/// Signs nothing; returns a predictable URL and records each request.
#[derive(Default)]
pub struct StaticIssuer {
    calls: Mutex<Vec<(String, Option<String>, u64)>>,
}

impl StaticIssuer {
    pub fn calls(&self) -> Vec<(String, Option<String>, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignedUrlIssuer for StaticIssuer {
    fn provider(&self) -> &'static str {
        "static"
    }

    async fn signed_put_url(
        &self,
        object_name: &str,
        content_type: Option<&str>,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        self.calls.lock().unwrap().push((
            object_name.to_string(),
            content_type.map(str::to_string),
            ttl.as_secs(),
        ));
        Ok(format!("https://storage.test/bucket/{}?signed=1", object_name))
    }
}

pub struct FailingIssuer;

#[async_trait]
impl SignedUrlIssuer for FailingIssuer {
    fn provider(&self) -> &'static str {
        "failing"
    }

    async fn signed_put_url(
        &self,
        _object_name: &str,
        _content_type: Option<&str>,
        _ttl: Duration,
    ) -> Result<String, StorageError> {
        Err(StorageError::Backend("permission denied".to_string()))
    }
}

/// Stores every file except ones whose name contains "reject".
#[derive(Default)]
pub struct RecordingRelay {
    received: Mutex<Vec<IncomingFile>>,
}

impl RecordingRelay {
    pub fn received(&self) -> Vec<IncomingFile> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelayTarget for RecordingRelay {
    fn kind(&self) -> RelayTargetKind {
        RelayTargetKind::Script
    }

    async fn relay(&self, file: IncomingFile) -> Result<StoredFile, RelayError> {
        self.received.lock().unwrap().push(file.clone());
        if file.original_name.contains("reject") {
            return Err(RelayError::Rejected("script refused file".to_string()));
        }
        Ok(StoredFile {
            name: file.original_name.clone(),
            url: format!("https://drive.test/{}", file.original_name),
            id: format!("id-{}", file.original_name),
            mime_type: file.content_type_or_default().to_string(),
            date_created: "2024-06-15T18:30:05Z".to_string(),
        })
    }
}

pub fn state_with(
    issuer: Arc<dyn SignedUrlIssuer>,
    relay: Option<Arc<dyn RelayTarget>>,
) -> AppState {
    let mut config = Config::default();
    config.server.rate_limit_per_second = 1000;
    AppState::new(config, issuer, relay, None)
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
