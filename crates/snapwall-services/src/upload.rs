use crate::{ServiceError, ServiceResult};
use snapwall_core::{EventId, MediaAsset, MediaKind, NewMedia, NEW_MEDIA_TOPIC};
use snapwall_db::MetadataStore;
use snapwall_infra::EventBus;
use snapwall_storage::{create_storage, ByteReader, Storage};
use std::sync::Arc;

/// Accepts guest uploads and announces them to the thumbnail workers.
#[derive(Clone)]
pub struct UploadService {
    metadata: Arc<dyn MetadataStore>,
    bus: Arc<dyn EventBus>,
}

impl UploadService {
    pub fn new(metadata: Arc<dyn MetadataStore>, bus: Arc<dyn EventBus>) -> Self {
        Self { metadata, bus }
    }

    /// Store an upload in the event's backend, record it and publish a
    /// "new media" notification.
    ///
    /// A failed publish is logged; the upload itself still succeeds.
    #[tracing::instrument(skip(self, reader), fields(event_id = event_id, filename = %filename))]
    pub async fn upload(
        &self,
        event_id: EventId,
        filename: &str,
        reader: ByteReader,
        content_type: &str,
    ) -> ServiceResult<MediaAsset> {
        let kind = MediaKind::from_content_type(content_type)
            .ok_or_else(|| ServiceError::UnsupportedContentType(content_type.to_string()))?;

        let event = self.metadata.get_event(event_id).await?;
        if !event.live {
            return Err(ServiceError::EventNotLive(event_id));
        }

        let storage = create_storage(&event.storage).await?;
        let id = storage.store(filename, reader).await?;

        let asset = MediaAsset {
            id,
            event_id,
            name: filename.to_string(),
            kind,
        };
        self.metadata.add_media_asset(&asset).await?;

        let message = NewMedia {
            event_id,
            file_id: asset.id.clone(),
            kind,
        };
        match message.to_payload() {
            Ok(payload) => {
                if let Err(e) = self.bus.publish(NEW_MEDIA_TOPIC, payload).await {
                    tracing::warn!(asset_id = %asset.id, error = %e, "Failed to publish new media notification");
                }
            }
            Err(e) => {
                tracing::warn!(asset_id = %asset.id, error = %e, "Failed to encode new media notification");
            }
        }

        tracing::info!(
            asset_id = %asset.id,
            kind = %kind,
            backend = %storage.backend_kind(),
            "Upload stored"
        );

        Ok(asset)
    }
}
