//! Google Drive storage via the Drive v3 REST API.

use crate::traits::{buffer_reader, ByteReader, ByteStream, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use serde::Deserialize;
use snapwall_core::{CloudDriveConfig, StorageKind};
use uuid::Uuid;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

#[derive(Clone)]
pub struct DriveStorage {
    client: reqwest::Client,
    oauth_token: String,
    folder_id: String,
    api_base: String,
    upload_base: String,
}

impl std::fmt::Debug for DriveStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveStorage")
            .field("folder_id", &self.folder_id)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct CreatedFile {
    id: String,
}

impl DriveStorage {
    pub fn new(config: &CloudDriveConfig) -> StorageResult<Self> {
        if config.oauth_token.is_empty() {
            return Err(StorageError::ConfigError(
                "Cloud drive OAuth token not configured".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(DriveStorage {
            client,
            oauth_token: config.oauth_token.clone(),
            folder_id: config.folder_id.clone(),
            api_base: base_url(config.api_base.as_deref(), DEFAULT_API_BASE),
            upload_base: base_url(config.upload_base.as_deref(), DEFAULT_UPLOAD_BASE),
        })
    }

    /// Point the client at a different Drive-compatible endpoint.
    pub fn with_base_urls(mut self, api_base: impl Into<String>, upload_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self.upload_base = upload_base.into().trim_end_matches('/').to_string();
        self
    }
}

fn base_url(configured: Option<&str>, default: &str) -> String {
    configured
        .filter(|url| !url.trim().is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

/// Build a `multipart/related` upload body: JSON metadata part, then the file bytes.
pub(crate) fn multipart_body(boundary: &str, name: &str, folder_id: &str, data: &[u8]) -> Vec<u8> {
    let metadata = if folder_id.is_empty() {
        serde_json::json!({ "name": name })
    } else {
        serde_json::json!({ "name": name, "parents": [folder_id] })
    };

    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{}\r\n",
            boundary, metadata
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!("--{}\r\nContent-Type: application/octet-stream\r\n\r\n", boundary).as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

fn status_error(status: StatusCode, body: &str) -> StorageError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StorageError::BackendError(format!("Drive rejected credentials ({}): {}", status, body))
        }
        _ => StorageError::BackendError(format!("Drive returned {}: {}", status, body)),
    }
}

#[async_trait]
impl Storage for DriveStorage {
    async fn store(&self, name: &str, reader: ByteReader) -> StorageResult<String> {
        let start = std::time::Instant::now();
        let data = buffer_reader(reader).await?;
        let size = data.len() as u64;

        let boundary = format!("snapwall-{}", Uuid::new_v4().simple());
        let body = multipart_body(&boundary, name, &self.folder_id, &data);

        let response = self
            .client
            .post(format!(
                "{}/files?uploadType=multipart&fields=id",
                self.upload_base
            ))
            .bearer_auth(&self.oauth_token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                name = %name,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Drive upload failed"
            );
            return Err(status_error(status, &body));
        }

        let created: CreatedFile = response
            .json()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Invalid Drive response: {}", e)))?;

        tracing::info!(
            file_id = %created.id,
            name = %name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Drive upload successful"
        );

        Ok(created.id)
    }

    async fn get(&self, id: &str) -> StorageResult<ByteStream> {
        let response = self
            .client
            .get(format!(
                "{}/files/{}?alt=media",
                self.api_base,
                urlencoding::encode(id)
            ))
            .bearer_auth(&self.oauth_token)
            .send()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let key = id.to_string();
        let stream = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| {
                tracing::error!(file_id = %key, error = %e, "Drive stream read error");
                StorageError::DownloadFailed(e.to_string())
            })
        });

        Ok(Box::pin(stream))
    }

    fn backend_kind(&self) -> StorageKind {
        StorageKind::CloudDrive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{failing_reader, reader};
    use crate::traits::collect_stream;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn config(token: &str, api_base: Option<String>, upload_base: Option<String>) -> CloudDriveConfig {
        CloudDriveConfig {
            oauth_token: token.to_string(),
            folder_id: "folder-1".to_string(),
            api_base,
            upload_base,
        }
    }

    fn content_length(head: &str) -> usize {
        head.lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Serve one HTTP response and report the full request.
    async fn serve_once(status: &'static str, body: &'static [u8]) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            let mut expected = None;
            loop {
                if expected.is_none() {
                    if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                        let head = String::from_utf8_lossy(&request[..pos]).into_owned();
                        expected = Some(pos + 4 + content_length(&head));
                    }
                }
                if matches!(expected, Some(total) if request.len() >= total) {
                    break;
                }
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());

            let head = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        (format!("http://{}", addr), rx)
    }

    #[test]
    fn multipart_body_layout() {
        let body = multipart_body("b0", "thumb_a.webp", "folder-1", b"DATA");
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with("--b0\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n"));
        assert!(text.contains(r#""parents":["folder-1"]"#));
        assert!(text.contains(r#""name":"thumb_a.webp""#));
        assert!(text.contains("Content-Type: application/octet-stream\r\n\r\nDATA\r\n--b0--\r\n"));
    }

    #[test]
    fn multipart_body_without_folder() {
        let text = String::from_utf8(multipart_body("b1", "a.jpg", "", b"")).unwrap();
        assert!(!text.contains("parents"));
    }

    #[test]
    fn rejects_missing_token_and_hides_it() {
        assert!(matches!(
            DriveStorage::new(&config("", None, None)),
            Err(StorageError::ConfigError(_))
        ));

        let storage = DriveStorage::new(&config("ya29.token", None, None)).unwrap();
        assert_eq!(storage.api_base, DEFAULT_API_BASE);
        assert_eq!(storage.upload_base, DEFAULT_UPLOAD_BASE);
        assert!(!format!("{:?}", storage).contains("ya29"));

        let storage = storage.with_base_urls("http://localhost:8080/drive/v3/", "http://localhost:8080/upload");
        assert_eq!(storage.api_base, "http://localhost:8080/drive/v3");
    }

    #[test]
    fn configured_endpoints_replace_defaults() {
        let storage = DriveStorage::new(&config(
            "t",
            Some("http://drive.local/v3/".to_string()),
            Some("http://drive.local/upload/v3".to_string()),
        ))
        .unwrap();
        assert_eq!(storage.api_base, "http://drive.local/v3");
        assert_eq!(storage.upload_base, "http://drive.local/upload/v3");
    }

    #[tokio::test]
    async fn test_store_then_get() {
        let (upload_base, upload_request) = serve_once("200 OK", br#"{"id":"drive-file-1"}"#).await;
        let (api_base, download_request) = serve_once("200 OK", b"JPEGDATA").await;
        let storage =
            DriveStorage::new(&config("ya29.token", Some(api_base), Some(upload_base))).unwrap();

        let id = storage.store("IMG_0001.jpg", reader(b"JPEGDATA")).await.unwrap();
        assert_eq!(id, "drive-file-1");

        let request = upload_request.await.unwrap();
        assert!(
            request.starts_with("POST /files?uploadType=multipart&fields=id HTTP/1.1"),
            "{}",
            request
        );
        let lowered = request.to_ascii_lowercase();
        assert!(lowered.contains("authorization: bearer ya29.token"));
        assert!(lowered.contains("content-type: multipart/related; boundary=snapwall-"));
        assert!(request.contains(r#""name":"IMG_0001.jpg""#));
        assert!(request.contains(r#""parents":["folder-1"]"#));
        assert!(request.contains("JPEGDATA"));

        let data = collect_stream(storage.get(&id).await.unwrap()).await.unwrap();
        assert_eq!(data, b"JPEGDATA");

        let request = download_request.await.unwrap();
        assert!(
            request.starts_with("GET /files/drive-file-1?alt=media HTTP/1.1"),
            "{}",
            request
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let (api_base, _) = serve_once("404 Not Found", br#"{"error":{"code":404}}"#).await;
        let storage = DriveStorage::new(&config("t", Some(api_base), None)).unwrap();

        assert!(matches!(
            storage.get("gone").await,
            Err(StorageError::NotFound(ref id)) if id == "gone"
        ));
    }

    #[tokio::test]
    async fn test_rejected_upload_reports_status() {
        let (upload_base, _) = serve_once("401 Unauthorized", b"invalid token").await;
        let storage = DriveStorage::new(&config("t", None, Some(upload_base))).unwrap();

        match storage.store("a.jpg", reader(b"A")).await {
            Err(StorageError::BackendError(msg)) => assert!(msg.contains("invalid token"), "{}", msg),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_failing_source_sends_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let storage = DriveStorage::new(&config("t", Some(base.clone()), Some(base))).unwrap();

        let result = storage.store("broken.jpg", failing_reader(b"half")).await;
        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
        assert!(
            tokio::time::timeout(Duration::from_millis(200), listener.accept())
                .await
                .is_err(),
            "upload request was sent"
        );
    }
}
