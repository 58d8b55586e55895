//! Event bus payloads

use serde::{Deserialize, Serialize};

use super::event::EventId;
use super::media::MediaKind;
use crate::error::PipelineError;

/// Topic carrying [`NewMedia`] notifications.
pub const NEW_MEDIA_TOPIC: &str = "new-photo";

/// Topic carrying the id of every newly created thumbnail as raw UTF-8 bytes.
pub const NEW_THUMBNAIL_TOPIC: &str = "new-thumbnail";

/// Published after an original is stored and recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMedia {
    pub event_id: EventId,
    pub file_id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
}

impl NewMedia {
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode a bus payload. Malformed input is a permanent failure.
    pub fn from_payload(payload: &[u8]) -> Result<Self, PipelineError> {
        serde_json::from_slice(payload).map_err(|e| {
            PipelineError::permanent(format!("malformed new media payload: {}", e)).with_source(e)
        })
    }
}
