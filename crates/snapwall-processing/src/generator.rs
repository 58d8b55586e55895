use async_trait::async_trait;
use snapwall_core::{ErrorKind, MediaKind};
use snapwall_storage::ByteReader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Thumbnail request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Thumbnail service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Thumbnail generation failed: {0}")]
    Other(String),
}

impl GeneratorError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Transient
    }
}

pub type GeneratorResult<T> = Result<T, GeneratorError>;

/// Produces preview bytes for a media URL reachable by the generator.
#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    async fn thumb_image(&self, url: &str) -> GeneratorResult<ByteReader>;

    async fn thumb_video(&self, url: &str) -> GeneratorResult<ByteReader>;

    async fn thumbnail(&self, kind: MediaKind, url: &str) -> GeneratorResult<ByteReader> {
        match kind {
            MediaKind::Image => self.thumb_image(url).await,
            MediaKind::Video => self.thumb_video(url).await,
        }
    }
}
