use serde::{Deserialize, Serialize};

use super::storage::StorageDescriptor;

pub type EventId = u64;

/// A photo-collection event.
///
/// `storage` decides where originals and thumbnails of this event live;
/// `cache_enabled` opts the event's blobs into the read-through cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub name: String,
    /// Uploads are only accepted while the event is live.
    pub live: bool,
    pub storage: StorageDescriptor,
    pub cache_enabled: bool,
}
