// Sequential upload loop against the broker API

use std::path::Path;

use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, multipart, Client};
use tracing::{debug, error, info};

use super::session::UploadSession;
use super::ClientError;
use crate::models::{FileUploadOutcome, SignedUrlRequest, SignedUrlResponse};
use crate::relay::StoredFile;
use crate::types::UploadStatus;
use crate::utils::naming::{client_object_name, epoch_millis};

/// How files reach storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Ask the broker for a signed URL, then `PUT` straight to the bucket.
    Direct,
    /// Post the file to the broker, which forwards it.
    Relayed,
}

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, content_type: Option<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type,
            data: data.into(),
        }
    }

    /// Read a file, guessing its MIME type from the extension.
    pub async fn read(path: &Path) -> Result<Self, ClientError> {
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string());
        Ok(Self::new(name, content_type, data))
    }

    /// Same filter as the page's `accept="image/*,video/*"`.
    pub fn is_media(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.parse::<mime::Mime>().ok())
            .map(|m| m.type_() == mime::IMAGE || m.type_() == mime::VIDEO)
            .unwrap_or(false)
    }
}

pub struct Uploader {
    client: Client,
    base_url: String,
}

impl Uploader {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn request_signed_url(
        &self,
        object_name: &str,
        content_type: Option<&str>,
    ) -> Result<String, ClientError> {
        let request = SignedUrlRequest {
            filename: Some(object_name.to_string()),
            content_type: content_type.map(str::to_string),
        };

        let response = self
            .client
            .post(self.endpoint("/api/generatePutUrl"))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SignedUrlResponse = response.json().await.map_err(|_| ClientError::MissingUrl)?;
        if parsed.url.is_empty() {
            return Err(ClientError::MissingUrl);
        }
        Ok(parsed.url)
    }

    /// Signed URL, then one `PUT` with the file's own content type.
    pub async fn upload_direct(&self, file: &LocalFile) -> Result<(), ClientError> {
        let object_name = client_object_name(&file.name, epoch_millis());
        let url = self
            .request_signed_url(&object_name, file.content_type.as_deref())
            .await?;

        let mut put = self.client.put(&url).body(file.data.clone());
        if let Some(ct) = &file.content_type {
            put = put.header(CONTENT_TYPE, ct);
        }

        let response = put.send().await?;
        let status = response.status();
        if status.is_success() {
            info!(file = %object_name, "File uploaded successfully");
            Ok(())
        } else {
            error!(file = %object_name, status = status.as_u16(), "File upload failed");
            Err(ClientError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }

    /// Post one file as multipart field `file` to the relay.
    pub async fn upload_relayed(&self, file: &LocalFile) -> Result<FileUploadOutcome, ClientError> {
        let mut part = multipart::Part::bytes(file.data.to_vec()).file_name(file.name.clone());
        if let Some(ct) = &file.content_type {
            part = part.mime_str(ct)?;
        }
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("/api/files"))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let outcomes: Vec<FileUploadOutcome> = response.json().await?;
        let outcome = outcomes.into_iter().next().ok_or_else(|| {
            ClientError::Rejected("relay answered without an outcome".to_string())
        })?;

        if outcome.success {
            Ok(outcome)
        } else {
            Err(ClientError::Rejected(
                outcome.error.unwrap_or_else(|| "upload failed".to_string()),
            ))
        }
    }

    /// Upload every file once, in order, updating `session` as each ends.
    ///
    /// `on_change` sees the session after `begin` and after every update.
    pub async fn upload_all<F>(
        &self,
        session: &mut UploadSession,
        files: &[LocalFile],
        mode: UploadMode,
        mut on_change: F,
    ) where
        F: FnMut(&UploadSession),
    {
        session.begin(files.iter().map(|f| f.name.clone()));
        on_change(session);

        for (index, file) in files.iter().enumerate() {
            let result = match mode {
                UploadMode::Direct => self.upload_direct(file).await,
                UploadMode::Relayed => self.upload_relayed(file).await.map(|_| ()),
            };

            let status = match result {
                Ok(()) => UploadStatus::Success,
                Err(e) => {
                    debug!(file = %file.name, error = %e, "Marking file as failed");
                    UploadStatus::Failure
                }
            };
            session.update_file_status(index, status);
            on_change(session);
        }
    }

    pub async fn list_files(&self) -> Result<Vec<StoredFile>, ClientError> {
        let response = self.client.get(self.endpoint("/api/files")).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn photo(name: &str) -> LocalFile {
        LocalFile::new(name, Some("image/jpeg".to_string()), Bytes::from_static(b"jpeg-bytes"))
    }

    #[test]
    fn test_is_media() {
        assert!(photo("a.jpg").is_media());
        assert!(LocalFile::new("v.mp4", Some("video/mp4".to_string()), Bytes::new()).is_media());
        assert!(!LocalFile::new("t.txt", Some("text/plain".to_string()), Bytes::new()).is_media());
        assert!(!LocalFile::new("x", None, Bytes::new()).is_media());
    }

    #[tokio::test]
    async fn test_read_guesses_type() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("toast.MP4");
        std::fs::write(&path, b"moov").unwrap();

        let file = LocalFile::read(&path).await.unwrap();
        assert_eq!(file.name, "toast.MP4");
        assert_eq!(file.content_type.as_deref(), Some("video/mp4"));
        assert_eq!(&file.data[..], b"moov");
    }

    #[tokio::test]
    async fn test_direct_upload_loop() {
        let mut server = mockito::Server::new_async().await;
        let put_url = format!("{}/bucket/object?sig=1", server.url());

        let sign = server
            .mock("POST", "/api/generatePutUrl")
            .match_body(Matcher::Regex(
                r#"^\{"filename":"\d+-(a|b)\.jpg","contentType":"image/jpeg"\}$"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "url": put_url }).to_string())
            .expect(2)
            .create_async()
            .await;

        // First PUT succeeds, second is refused
        let ok_put = server
            .mock("PUT", "/bucket/object")
            .match_query(Matcher::Any)
            .match_header("content-type", "image/jpeg")
            .match_body("jpeg-bytes")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let uploader = Uploader::new(&format!("{}/", server.url())).unwrap();
        let mut session = UploadSession::new();
        let mut snapshots = Vec::new();

        uploader
            .upload_all(&mut session, &[photo("a.jpg")], UploadMode::Direct, |s| {
                snapshots.push(s.statuses()[0].status)
            })
            .await;

        assert_eq!(snapshots, vec![UploadStatus::Uploading, UploadStatus::Success]);
        ok_put.assert_async().await;

        ok_put.remove_async().await;
        let failed_put = server
            .mock("PUT", "/bucket/object")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        uploader
            .upload_all(&mut session, &[photo("b.jpg")], UploadMode::Direct, |_| {})
            .await;
        assert_eq!(session.statuses()[0].status, UploadStatus::Failure);

        sign.assert_async().await;
        failed_put.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_signed_url_marks_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/generatePutUrl")
            .with_status(500)
            .with_body(r#"{"message":"Failed to generate signed URL"}"#)
            .create_async()
            .await;

        let uploader = Uploader::new(&server.url()).unwrap();
        let mut session = UploadSession::new();
        uploader
            .upload_all(
                &mut session,
                &[photo("a.jpg"), photo("b.jpg")],
                UploadMode::Direct,
                |_| {},
            )
            .await;

        assert!(session.is_complete());
        assert_eq!(session.failed(), 2);

        let result = uploader.request_signed_url("x.jpg", None).await;
        assert!(matches!(result, Err(ClientError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_relayed_upload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/files")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".to_string()))
            .match_body(Matcher::Regex(r#"name="file"; filename="good.jpg""#.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([{
                    "success": true,
                    "name": "good.jpg",
                    "file": {
                        "name": "1-x.jpg",
                        "url": "https://drive.example/1",
                        "id": "1",
                        "mimeType": "image/jpeg",
                        "dateCreated": "2024-06-15T18:30:05Z"
                    }
                }])
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("POST", "/api/files")
            .match_body(Matcher::Regex(r#"filename="bad.jpg""#.to_string()))
            .with_status(200)
            .with_body(r#"[{"success":false,"name":"bad.jpg","error":"quota"}]"#)
            .create_async()
            .await;

        let uploader = Uploader::new(&server.url()).unwrap();

        let outcome = uploader.upload_relayed(&photo("good.jpg")).await.unwrap();
        assert_eq!(outcome.file.unwrap().id, "1");

        let rejected = uploader.upload_relayed(&photo("bad.jpg")).await;
        assert!(matches!(rejected, Err(ClientError::Rejected(ref msg)) if msg == "quota"));

        let mut session = UploadSession::new();
        uploader
            .upload_all(
                &mut session,
                &[photo("good.jpg"), photo("bad.jpg")],
                UploadMode::Relayed,
                |_| {},
            )
            .await;
        assert_eq!(session.statuses()[0].status, UploadStatus::Success);
        assert_eq!(session.statuses()[1].status, UploadStatus::Failure);
    }

    #[tokio::test]
    async fn test_list_files() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/files")
            .with_status(200)
            .with_body(
                json!([{
                    "name": "a.jpg",
                    "url": "https://drive.example/a",
                    "id": "a",
                    "mimeType": "image/jpeg",
                    "dateCreated": "2024-06-15T18:30:05Z"
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let uploader = Uploader::new(&server.url()).unwrap();
        let files = uploader.list_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.jpg");
    }
}
