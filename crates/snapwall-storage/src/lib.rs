//! Snapwall Storage Library
//!
//! Blob storage for event originals and thumbnails. Each event is configured with
//! exactly one backend (see [`snapwall_core::StorageDescriptor`]); [`create_storage`]
//! turns that descriptor into a [`StorageBackend`], a closed enum that implements
//! [`Storage`] by delegating to the concrete backend.
//!
//! # Identifiers
//!
//! `store` returns the identifier under which the blob can later be read back:
//!
//! - **Filesystem**: the given name. Storing the same name twice overwrites.
//! - **Object store, FTP**: a fresh UUID keeping the original extension.
//! - **Cloud drive**: the file id assigned by the drive.

pub mod backend;
pub mod drive;
pub mod factory;
pub mod ftp;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use backend::StorageBackend;
pub use drive::DriveStorage;
pub use factory::create_storage;
pub use ftp::FtpStorage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use snapwall_core::StorageKind;
pub use traits::{
    buffer_reader, collect_stream, ByteReader, ByteStream, Storage, StorageError, StorageResult,
};
