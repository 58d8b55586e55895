//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use snapwall_core::{ErrorKind, StorageKind};
use std::pin::Pin;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::InvalidKey(_) => ErrorKind::Permanent,
            StorageError::ConfigError(_) => ErrorKind::Configuration,
            _ => ErrorKind::Transient,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Byte source handed to [`Storage::store`]
pub type ByteReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Chunked blob contents returned by [`Storage::get`]
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Storage abstraction trait
///
/// Implementations are shared between worker tasks behind an `Arc` and must be
/// safe to call concurrently.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Consume `reader` to EOF and persist its bytes, returning the blob id.
    ///
    /// If the reader fails, an error is returned and no blob becomes readable
    /// under any id.
    async fn store(&self, name: &str, reader: ByteReader) -> StorageResult<String>;

    /// Open a stored blob. Absent ids yield [`StorageError::NotFound`].
    async fn get(&self, id: &str) -> StorageResult<ByteStream>;

    /// Get the storage backend type
    fn backend_kind(&self) -> StorageKind;
}

/// Read a source to EOF into memory.
///
/// Backends that upload in a single request buffer first so that a failing source
/// never produces a partial remote object.
pub async fn buffer_reader(mut reader: ByteReader) -> StorageResult<Vec<u8>> {
    let mut buffer = Vec::new();
    reader
        .read_to_end(&mut buffer)
        .await
        .map_err(|e| StorageError::UploadFailed(format!("Failed to read from stream: {}", e)))?;
    Ok(buffer)
}

/// Drain a [`ByteStream`] into a single buffer.
pub async fn collect_stream(mut stream: ByteStream) -> StorageResult<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = stream.next().await {
        data.extend_from_slice(&chunk?);
    }
    Ok(data)
}
