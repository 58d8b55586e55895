use crate::{DriveStorage, FtpStorage, StorageBackend, StorageResult};
#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
#[cfg(not(all(feature = "storage-local", feature = "storage-s3")))]
use crate::StorageError;
use snapwall_core::StorageDescriptor;

/// Create the storage backend described by an event's configuration
pub async fn create_storage(descriptor: &StorageDescriptor) -> StorageResult<StorageBackend> {
    tracing::debug!(backend = %descriptor.kind(), "Creating storage backend");

    match descriptor {
        #[cfg(feature = "storage-local")]
        StorageDescriptor::Filesystem(cfg) => {
            let storage = LocalStorage::new(&cfg.directory).await?;
            Ok(StorageBackend::Filesystem(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageDescriptor::Filesystem(_) => Err(StorageError::ConfigError(
            "Filesystem storage backend not available (storage-local feature not enabled)"
                .to_string(),
        )),

        #[cfg(feature = "storage-s3")]
        StorageDescriptor::ObjectStore(cfg) => {
            let storage = S3Storage::new(cfg)?;
            Ok(StorageBackend::ObjectStore(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageDescriptor::ObjectStore(_) => Err(StorageError::ConfigError(
            "Object storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        StorageDescriptor::Ftp(cfg) => Ok(StorageBackend::Ftp(FtpStorage::new(cfg)?)),

        StorageDescriptor::CloudDrive(cfg) => {
            Ok(StorageBackend::CloudDrive(DriveStorage::new(cfg)?))
        }
    }
}
