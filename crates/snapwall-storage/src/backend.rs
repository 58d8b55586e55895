#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{ByteReader, ByteStream, DriveStorage, FtpStorage, Storage, StorageResult};
use async_trait::async_trait;
use snapwall_core::StorageKind;

/// A resolved storage backend for one event
#[derive(Clone, Debug)]
pub enum StorageBackend {
    #[cfg(feature = "storage-local")]
    Filesystem(LocalStorage),
    #[cfg(feature = "storage-s3")]
    ObjectStore(S3Storage),
    Ftp(FtpStorage),
    CloudDrive(DriveStorage),
}

#[async_trait]
impl Storage for StorageBackend {
    async fn store(&self, name: &str, reader: ByteReader) -> StorageResult<String> {
        match self {
            #[cfg(feature = "storage-local")]
            StorageBackend::Filesystem(s) => s.store(name, reader).await,
            #[cfg(feature = "storage-s3")]
            StorageBackend::ObjectStore(s) => s.store(name, reader).await,
            StorageBackend::Ftp(s) => s.store(name, reader).await,
            StorageBackend::CloudDrive(s) => s.store(name, reader).await,
        }
    }

    async fn get(&self, id: &str) -> StorageResult<ByteStream> {
        match self {
            #[cfg(feature = "storage-local")]
            StorageBackend::Filesystem(s) => s.get(id).await,
            #[cfg(feature = "storage-s3")]
            StorageBackend::ObjectStore(s) => s.get(id).await,
            StorageBackend::Ftp(s) => s.get(id).await,
            StorageBackend::CloudDrive(s) => s.get(id).await,
        }
    }

    fn backend_kind(&self) -> StorageKind {
        match self {
            #[cfg(feature = "storage-local")]
            StorageBackend::Filesystem(s) => s.backend_kind(),
            #[cfg(feature = "storage-s3")]
            StorageBackend::ObjectStore(s) => s.backend_kind(),
            StorageBackend::Ftp(s) => s.backend_kind(),
            StorageBackend::CloudDrive(s) => s.backend_kind(),
        }
    }
}
