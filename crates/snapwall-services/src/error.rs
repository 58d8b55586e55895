use snapwall_core::{ErrorKind, EventId};
use snapwall_db::MetadataError;
use snapwall_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Event {0} is not live")]
    EventNotLive(EventId),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::UnsupportedContentType(_) | ServiceError::EventNotLive(_) => {
                ErrorKind::Permanent
            }
            ServiceError::Metadata(e) => e.kind(),
            ServiceError::Storage(e) => e.kind(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
