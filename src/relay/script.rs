// Spreadsheet-backed script web app relay
//
// The script accepts a JSON body with the file inlined as base64 and answers
// `{ success, file?, error? }`. A GET on the same URL lists stored files.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{IncomingFile, RelayError, RelayTarget, StoredFile};
use crate::config::RelayTargetKind;
use crate::utils::naming::{epoch_millis, relay_object_name};

pub struct ScriptRelay {
    client: Client,
    url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptUploadRequest<'a> {
    file_name: &'a str,
    original_name: &'a str,
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct ScriptResponse {
    success: bool,
    #[serde(default)]
    file: Option<StoredFile>,
    #[serde(default)]
    error: Option<String>,
}

impl ScriptRelay {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, RelayError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Files the script has stored so far.
    pub async fn list_files(&self) -> Result<Vec<StoredFile>, RelayError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let files: Vec<StoredFile> = response
            .json()
            .await
            .map_err(|e| RelayError::InvalidResponse(e.to_string()))?;
        debug!(count = files.len(), "Listed files from script");
        Ok(files)
    }

    async fn upload(&self, file: &IncomingFile, object_name: &str) -> Result<StoredFile, RelayError> {
        let mime_type = file.content_type_or_default();
        let request = ScriptUploadRequest {
            file_name: object_name,
            original_name: &file.original_name,
            mime_type,
            data: BASE64.encode(&file.data),
        };

        let response = self.client.post(&self.url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ScriptResponse = response
            .json()
            .await
            .map_err(|e| RelayError::InvalidResponse(e.to_string()))?;

        match parsed {
            ScriptResponse {
                success: true,
                file: Some(stored),
                ..
            } => Ok(stored),
            ScriptResponse { success: true, file: None, .. } => Err(RelayError::InvalidResponse(
                "script reported success without a file record".to_string(),
            )),
            ScriptResponse { error, .. } => Err(RelayError::Rejected(
                error.unwrap_or_else(|| "unknown script error".to_string()),
            )),
        }
    }
}

#[async_trait]
impl RelayTarget for ScriptRelay {
    fn kind(&self) -> RelayTargetKind {
        RelayTargetKind::Script
    }

    async fn relay(&self, file: IncomingFile) -> Result<StoredFile, RelayError> {
        let object_name = relay_object_name(&file.original_name, epoch_millis(), Uuid::new_v4());
        info!(
            original = %file.original_name,
            object = %object_name,
            bytes = file.data.len(),
            "Relaying file to script"
        );

        match self.upload(&file, &object_name).await {
            Ok(stored) => {
                info!(original = %file.original_name, id = %stored.id, "Script stored file");
                Ok(stored)
            }
            Err(e) => {
                warn!(original = %file.original_name, error = %e, "Script upload failed");
                Err(e)
            }
        }
    }
}
