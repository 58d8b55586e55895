use snapwall_core::{ErrorKind, PipelineError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid storage configuration for event {event_id}: {source}")]
    InvalidStorage {
        event_id: u64,
        #[source]
        source: PipelineError,
    },

    #[error("{entity} already exists with different contents: {id}")]
    Conflict { entity: &'static str, id: String },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl MetadataError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        MetadataError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(entity: &'static str, id: impl ToString) -> Self {
        MetadataError::Conflict {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MetadataError::NotFound { .. } => ErrorKind::NotFound,
            MetadataError::InvalidStorage { .. } => ErrorKind::Configuration,
            MetadataError::Conflict { .. } | MetadataError::InvalidRecord(_) => ErrorKind::Permanent,
            MetadataError::Database(_) => ErrorKind::Transient,
        }
    }
}

pub type MetadataResult<T> = Result<T, MetadataError>;
