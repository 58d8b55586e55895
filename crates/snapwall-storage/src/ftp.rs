use crate::keys::{unique_key, validate_flat_key};
use crate::traits::{buffer_reader, ByteReader, ByteStream, Storage, StorageError, StorageResult};
use async_ftp::{FtpError, FtpStream};
use async_trait::async_trait;
use bytes::Bytes;
use snapwall_core::{FtpConfig, StorageKind};
use std::io::Cursor;

/// FTP storage
///
/// Every operation opens its own control connection, logs in, changes to the
/// configured directory and quits afterwards. Uploads go to `{key}.partial` and
/// are renamed once complete.
#[derive(Clone, Debug)]
pub struct FtpStorage {
    config: FtpConfig,
}

impl FtpStorage {
    pub fn new(config: &FtpConfig) -> StorageResult<Self> {
        if config.address.trim().is_empty() {
            return Err(StorageError::ConfigError(
                "FTP address not configured".to_string(),
            ));
        }
        Ok(FtpStorage {
            config: config.clone(),
        })
    }

    async fn session(&self) -> StorageResult<FtpStream> {
        let mut ftp = FtpStream::connect(self.config.address.as_str())
            .await
            .map_err(|e| classify(e, &self.config.address))?;

        ftp.login(&self.config.username, &self.config.password)
            .await
            .map_err(|e| {
                StorageError::BackendError(format!(
                    "FTP login to {} failed: {}",
                    self.config.address, e
                ))
            })?;

        if !self.config.directory.is_empty() {
            ftp.cwd(&self.config.directory)
                .await
                .map_err(|e| classify(e, &self.config.directory))?;
        }

        Ok(ftp)
    }

    async fn close(&self, mut ftp: FtpStream) {
        if let Err(e) = ftp.quit().await {
            tracing::debug!(address = %self.config.address, error = %e, "FTP quit failed");
        }
    }
}

/// Whether an FTP reply reports a missing file or directory (code 550).
pub fn is_file_unavailable(reply: &str) -> bool {
    reply
        .split(|c: char| c.is_whitespace() || c == ':')
        .any(|token| token == "550" || token.starts_with("550-"))
}

fn classify(err: FtpError, subject: &str) -> StorageError {
    match err {
        FtpError::InvalidResponse(ref reply) if is_file_unavailable(reply) => {
            StorageError::NotFound(subject.to_string())
        }
        FtpError::ConnectionError(e) => {
            StorageError::BackendError(format!("FTP connection error: {}", e))
        }
        other => StorageError::BackendError(other.to_string()),
    }
}

#[async_trait]
impl Storage for FtpStorage {
    async fn store(&self, name: &str, reader: ByteReader) -> StorageResult<String> {
        let start = std::time::Instant::now();
        let buffer = buffer_reader(reader).await?;
        let size = buffer.len() as u64;

        let key = unique_key(name);
        let partial = format!("{}.partial", key);

        let mut ftp = self.session().await?;

        let uploaded = async {
            ftp.put(&partial, &mut Cursor::new(buffer))
                .await
                .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
            ftp.rename(&partial, &key)
                .await
                .map_err(|e| StorageError::UploadFailed(e.to_string()))
        }
        .await;

        if let Err(e) = uploaded {
            if let Err(cleanup) = ftp.rm(&partial).await {
                tracing::debug!(key = %partial, error = %cleanup, "FTP partial cleanup failed");
            }
            self.close(ftp).await;
            tracing::error!(
                address = %self.config.address,
                key = %key,
                error = %e,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "FTP store failed"
            );
            return Err(e);
        }

        self.close(ftp).await;

        tracing::info!(
            address = %self.config.address,
            key = %key,
            name = %name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "FTP store successful"
        );

        Ok(key)
    }

    async fn get(&self, id: &str) -> StorageResult<ByteStream> {
        validate_flat_key(id)?;
        let start = std::time::Instant::now();

        let mut ftp = self.session().await?;
        let result = ftp.simple_retr(id).await;
        self.close(ftp).await;

        let data = result.map_err(|e| match classify(e, id) {
            StorageError::BackendError(msg) => StorageError::DownloadFailed(msg),
            other => other,
        })?;
        let data = Bytes::from(Cursor::into_inner(data));

        tracing::info!(
            address = %self.config.address,
            key = %id,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "FTP get successful"
        );

        Ok(Box::pin(futures::stream::once(async move {
            Ok::<Bytes, StorageError>(data)
        })))
    }

    fn backend_kind(&self) -> StorageKind {
        StorageKind::Ftp
    }
}
