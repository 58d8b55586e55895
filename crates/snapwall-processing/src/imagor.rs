use crate::{GeneratorError, GeneratorResult, ThumbnailGenerator};
use async_trait::async_trait;
use futures::TryStreamExt;
use snapwall_storage::ByteReader;
use std::time::Duration;
use tokio_util::io::StreamReader;

const IMAGE_OPERATIONS: &str = "unsafe/fit-in/200x200";
const VIDEO_OPERATIONS: &str = "unsafe/300x0/7x7/filters:label(video,10,10,15,white,20):fill";

/// HTTP client for an imagor thumbnail service
#[derive(Clone, Debug)]
pub struct ImagorClient {
    client: reqwest::Client,
    base_url: String,
}

impl ImagorClient {
    pub fn new(base_url: &str) -> GeneratorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn image_url(&self, source: &str) -> String {
        format!("{}/{}/{}", self.base_url, IMAGE_OPERATIONS, source)
    }

    fn video_url(&self, source: &str) -> String {
        format!("{}/{}/{}", self.base_url, VIDEO_OPERATIONS, source)
    }

    async fn fetch(&self, url: String) -> GeneratorResult<ByteReader> {
        let start = std::time::Instant::now();
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(
                url = %url,
                status = status.as_u16(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Thumbnail service rejected request"
            );
            return Err(GeneratorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(
            url = %url,
            size_bytes = response.content_length(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Thumbnail response received"
        );

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        Ok(Box::pin(StreamReader::new(Box::pin(stream))))
    }
}

#[async_trait]
impl ThumbnailGenerator for ImagorClient {
    async fn thumb_image(&self, url: &str) -> GeneratorResult<ByteReader> {
        self.fetch(self.image_url(url)).await
    }

    async fn thumb_video(&self, url: &str) -> GeneratorResult<ByteReader> {
        self.fetch(self.video_url(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapwall_core::MediaKind;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one HTTP response and report the request line.
    async fn serve_once(status: &'static str, body: &'static [u8]) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let text = String::from_utf8_lossy(&request);
            let _ = tx.send(text.lines().next().unwrap_or_default().to_string());

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
    fn builds_imagor_paths() {
        let client = ImagorClient::new("http://imagor:8000/").unwrap();
        assert_eq!(
            client.image_url("http://app/storage/picture/abc"),
            "http://imagor:8000/unsafe/fit-in/200x200/http://app/storage/picture/abc"
        );
        assert_eq!(
            client.video_url("http://app/storage/picture/v.mp4"),
            "http://imagor:8000/unsafe/300x0/7x7/filters:label(video,10,10,15,white,20):fill/http://app/storage/picture/v.mp4"
        );
    }

    #[tokio::test]
    async fn test_streams_thumbnail_body() {
        let (base, request_line) = serve_once("200 OK", b"WEBPDATA").await;
        let client = ImagorClient::new(&base).unwrap();

        let mut reader = client
            .thumbnail(MediaKind::Image, "http://app/storage/picture/abc")
            .await
            .unwrap();
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await.unwrap();

        assert_eq!(data, b"WEBPDATA");
        let line = request_line.await.unwrap();
        assert!(line.starts_with("GET /unsafe/fit-in/200x200/"), "{}", line);
    }

    #[tokio::test]
    async fn test_error_status_carries_body() {
        let (base, _) = serve_once("502 Bad Gateway", b"upstream unreachable").await;
        let client = ImagorClient::new(&base).unwrap();

        let err = match client.thumb_video("http://app/storage/picture/v.mp4").await {
            Ok(_) => panic!("expected an error"),
            Err(e) => e,
        };
        match err {
            GeneratorError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream unreachable");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
