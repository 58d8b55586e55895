use crate::MetadataResult;
use async_trait::async_trait;
use snapwall_core::{Event, EventId, MediaAsset, ThumbnailAsset};

/// Metadata operations used by the upload path and the thumbnail pipeline.
///
/// Lookups of absent records return `MetadataError::NotFound`. Asset records are
/// write-once: re-adding an identical record succeeds, while a different record
/// under an existing id fails with `MetadataError::Conflict`.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Fetch an event with its storage settings resolved to a single backend.
    async fn get_event(&self, id: EventId) -> MetadataResult<Event>;

    async fn get_media_asset(&self, id: &str) -> MetadataResult<MediaAsset>;

    async fn add_media_asset(&self, asset: &MediaAsset) -> MetadataResult<()>;

    async fn add_thumbnail_asset(&self, thumbnail: &ThumbnailAsset) -> MetadataResult<()>;

    async fn get_thumbnail_asset(&self, id: &str) -> MetadataResult<ThumbnailAsset>;

    /// The thumbnail already generated for `source_asset_id`, if any.
    async fn find_thumbnail_for_source(
        &self,
        event_id: EventId,
        source_asset_id: &str,
    ) -> MetadataResult<Option<ThumbnailAsset>>;
}
