use crate::ServiceResult;
use snapwall_core::{CacheKey, Event};
use snapwall_db::MetadataStore;
use snapwall_infra::Cache;
use snapwall_storage::{collect_stream, create_storage, Storage};
use std::sync::Arc;

/// Serves originals and thumbnails, reading through the blob cache for events
/// that opted into caching.
#[derive(Clone)]
pub struct MediaService {
    metadata: Arc<dyn MetadataStore>,
    cache: Option<Arc<dyn Cache>>,
}

impl MediaService {
    pub fn new(metadata: Arc<dyn MetadataStore>, cache: Option<Arc<dyn Cache>>) -> Self {
        Self { metadata, cache }
    }

    /// Bytes of an uploaded original. This is what the thumbnail service fetches.
    #[tracing::instrument(skip(self))]
    pub async fn get_picture(&self, id: &str) -> ServiceResult<Vec<u8>> {
        let asset = self.metadata.get_media_asset(id).await?;
        let event = self.metadata.get_event(asset.event_id).await?;
        self.read_through(&event, &asset.id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_thumbnail(&self, id: &str) -> ServiceResult<Vec<u8>> {
        let thumbnail = self.metadata.get_thumbnail_asset(id).await?;
        let event = self.metadata.get_event(thumbnail.event_id).await?;
        self.read_through(&event, &thumbnail.id).await
    }

    async fn read_through(&self, event: &Event, blob_id: &str) -> ServiceResult<Vec<u8>> {
        let cache = self.cache.as_ref().filter(|_| event.cache_enabled);
        let key = CacheKey::new(event.id, blob_id);

        if let Some(cache) = cache {
            match cache.get(&key).await {
                Ok(Some(data)) => {
                    tracing::debug!(key = %key, size_bytes = data.len(), "Cache hit");
                    return Ok(data);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Cache read failed, falling back to storage");
                }
            }
        }

        let storage = create_storage(&event.storage).await?;
        let data = collect_stream(storage.get(blob_id).await?).await?;

        if let Some(cache) = cache {
            if let Err(e) = cache.set(&key, data.clone()).await {
                tracing::warn!(key = %key, error = %e, "Cache write failed");
            }
        }

        Ok(data)
    }
}
