use crate::pool::WorkerPoolConfig;
use crate::tee::ThumbnailSource;
use snapwall_core::{
    thumbnail_name_for, CacheKey, ErrorKind, NewMedia, PipelineError, PipelineState,
    ThumbnailAsset, NEW_THUMBNAIL_TOPIC,
};
use snapwall_db::MetadataStore;
use snapwall_infra::{Cache, EventBus};
use snapwall_processing::ThumbnailGenerator;
use snapwall_storage::{create_storage, Storage};
use std::error::Error;
use std::sync::Arc;
use std::time::Instant;

/// How a "new media" message was settled successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// A thumbnail was generated, stored and recorded.
    Created(String),
    /// A thumbnail already existed for the source asset; only the
    /// notification was sent again.
    AlreadyProcessed(String),
}

impl ProcessOutcome {
    pub fn thumbnail_id(&self) -> &str {
        match self {
            ProcessOutcome::Created(id) | ProcessOutcome::AlreadyProcessed(id) => id,
        }
    }
}

fn failed<E>(state: PipelineState, kind: ErrorKind, context: &str, err: E) -> PipelineError
where
    E: Error + Send + Sync + 'static,
{
    PipelineError::new(kind, format!("{}: {}", context, err))
        .at(state)
        .with_source(err)
}

/// Turns one "new media" message into a stored, recorded and announced thumbnail.
pub struct ThumbnailProcessor {
    metadata: Arc<dyn MetadataStore>,
    generator: Arc<dyn ThumbnailGenerator>,
    bus: Arc<dyn EventBus>,
    cache: Option<Arc<dyn Cache>>,
    internal_server_url: String,
    dedupe_by_source: bool,
}

impl ThumbnailProcessor {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        generator: Arc<dyn ThumbnailGenerator>,
        bus: Arc<dyn EventBus>,
        cache: Option<Arc<dyn Cache>>,
        config: &WorkerPoolConfig,
    ) -> Self {
        Self {
            metadata,
            generator,
            bus,
            cache,
            internal_server_url: config.internal_server_url.trim_end_matches('/').to_string(),
            dedupe_by_source: config.dedupe_by_source,
        }
    }

    /// URL the generator fetches the original from.
    pub fn source_url(&self, file_id: &str) -> String {
        format!("{}/storage/picture/{}", self.internal_server_url, file_id)
    }

    /// Process one raw bus payload. Every failure is logged here with the
    /// stage it happened after; the caller only has to settle the message.
    pub async fn process(&self, payload: &[u8]) -> Result<ProcessOutcome, PipelineError> {
        let message = match NewMedia::from_payload(payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(
                    stage = %e.state(),
                    kind = %e.kind(),
                    error = %e,
                    "Rejected new media message"
                );
                return Err(e);
            }
        };

        let start = Instant::now();
        let result = self.run(&message).await;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(outcome) => tracing::info!(
                event_id = message.event_id,
                asset_id = %message.file_id,
                thumbnail_id = %outcome.thumbnail_id(),
                duration_ms = %duration_ms,
                "Thumbnail processed"
            ),
            Err(e) => tracing::error!(
                event_id = message.event_id,
                asset_id = %message.file_id,
                stage = %e.state(),
                kind = %e.kind(),
                error = %e,
                duration_ms = %duration_ms,
                "Thumbnail processing failed"
            ),
        }

        result
    }

    #[tracing::instrument(skip(self, message), fields(event_id = message.event_id, asset_id = %message.file_id))]
    async fn run(&self, message: &NewMedia) -> Result<ProcessOutcome, PipelineError> {
        let event = self
            .metadata
            .get_event(message.event_id)
            .await
            .map_err(|e| failed(PipelineState::Received, e.kind(), "fetching event", e))?;
        let asset = self
            .metadata
            .get_media_asset(&message.file_id)
            .await
            .map_err(|e| failed(PipelineState::Received, e.kind(), "fetching media asset", e))?;
        if asset.event_id != event.id {
            return Err(PipelineError::permanent(format!(
                "media asset {} belongs to event {}, not {}",
                asset.id, asset.event_id, event.id
            ))
            .at(PipelineState::Received));
        }

        if self.dedupe_by_source {
            let existing = self
                .metadata
                .find_thumbnail_for_source(event.id, &asset.id)
                .await
                .map_err(|e| {
                    failed(PipelineState::MetadataFetched, e.kind(), "looking up thumbnail", e)
                })?;
            if let Some(existing) = existing {
                tracing::info!(thumbnail_id = %existing.id, "Thumbnail already exists, notifying again");
                self.notify(&existing.id, PipelineState::MetadataFetched).await?;
                return Ok(ProcessOutcome::AlreadyProcessed(existing.id));
            }
        }

        let storage = create_storage(&event.storage).await.map_err(|e| {
            failed(PipelineState::MetadataFetched, e.kind(), "opening event storage", e)
        })?;

        let url = self.source_url(&asset.id);
        let reader = self
            .generator
            .thumbnail(message.kind, &url)
            .await
            .map_err(|e| failed(PipelineState::MetadataFetched, e.kind(), "generating thumbnail", e))?;

        let cache = self.cache.as_ref().filter(|_| event.cache_enabled);
        let (reader, captured) = ThumbnailSource::new(reader, cache.is_some()).into_parts();

        let name = thumbnail_name_for(&asset.name);
        let thumbnail_id = storage
            .store(&name, reader)
            .await
            .map_err(|e| failed(PipelineState::Generated, e.kind(), "storing thumbnail", e))?;
        tracing::debug!(storage_key = %thumbnail_id, backend = %storage.backend_kind(), "Thumbnail stored");

        if let (Some(cache), Some(captured)) = (cache, captured) {
            let key = CacheKey::new(event.id, thumbnail_id.as_str());
            let data = captured.take();
            let size_bytes = data.len();
            match cache.set(&key, data).await {
                Ok(()) => tracing::debug!(key = %key, size_bytes, "Thumbnail cached"),
                Err(e) => tracing::warn!(key = %key, error = %e, "Failed to cache thumbnail"),
            }
        }

        let record = ThumbnailAsset {
            id: thumbnail_id.clone(),
            name,
            event_id: event.id,
            source_asset_id: asset.id,
        };
        if let Err(e) = self.metadata.add_thumbnail_asset(&record).await {
            // The blob stays behind; it is unreachable without a record.
            tracing::warn!(storage_key = %thumbnail_id, "Thumbnail stored without a record");
            return Err(failed(PipelineState::Stored, e.kind(), "recording thumbnail", e));
        }

        self.notify(&thumbnail_id, PipelineState::Persisted).await?;
        Ok(ProcessOutcome::Created(thumbnail_id))
    }

    async fn notify(&self, thumbnail_id: &str, state: PipelineState) -> Result<(), PipelineError> {
        self.bus
            .publish(NEW_THUMBNAIL_TOPIC, thumbnail_id.as_bytes().to_vec())
            .await
            .map_err(|e| failed(state, e.kind(), "publishing new thumbnail", e))
    }
}
