#![allow(dead_code)]

use async_trait::async_trait;
use snapwall_core::{
    CacheKey, Event, EventId, FilesystemConfig, MediaAsset, MediaKind, NewMedia,
    StorageDescriptor,
};
use snapwall_db::{InMemoryMetadataStore, MetadataStore};
use snapwall_infra::{Cache, CacheError, CacheResult, InMemoryBus, Subscription};
use snapwall_processing::{GeneratorError, GeneratorResult, ThumbnailGenerator};
use snapwall_storage::ByteReader;
use snapwall_worker::{ThumbnailProcessor, WorkerPoolConfig};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

pub const INTERNAL_URL: &str = "http://app.internal";
pub const THUMBDATA: &[u8] = b"THUMBDATA";

/// Generator double returning fixed bytes (or a fixed error) and recording calls.
pub struct ScriptedGenerator {
    output: Result<Vec<u8>, String>,
    calls: Mutex<Vec<(MediaKind, String)>>,
}

impl ScriptedGenerator {
    pub fn returning(data: &[u8]) -> Self {
        Self {
            output: Ok(data.to_vec()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            output: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(MediaKind, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self, kind: MediaKind, url: &str) -> GeneratorResult<ByteReader> {
        self.calls.lock().unwrap().push((kind, url.to_string()));
        match &self.output {
            Ok(data) => Ok(Box::pin(std::io::Cursor::new(data.clone()))),
            Err(message) => Err(GeneratorError::Status {
                status: 502,
                body: message.clone(),
            }),
        }
    }
}

#[async_trait]
impl ThumbnailGenerator for ScriptedGenerator {
    async fn thumb_image(&self, url: &str) -> GeneratorResult<ByteReader> {
        self.respond(MediaKind::Image, url)
    }

    async fn thumb_video(&self, url: &str) -> GeneratorResult<ByteReader> {
        self.respond(MediaKind::Video, url)
    }
}

/// Generator that signals `started` and then holds each call until `release`.
pub struct GatedGenerator {
    pub started: Notify,
    pub release: Notify,
    calls: AtomicUsize,
}

impl GatedGenerator {
    pub fn new() -> Self {
        Self {
            started: Notify::new(),
            release: Notify::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond(&self) -> GeneratorResult<ByteReader> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        Ok(Box::pin(std::io::Cursor::new(THUMBDATA.to_vec())))
    }
}

#[async_trait]
impl ThumbnailGenerator for GatedGenerator {
    async fn thumb_image(&self, _url: &str) -> GeneratorResult<ByteReader> {
        self.respond().await
    }

    async fn thumb_video(&self, _url: &str) -> GeneratorResult<ByteReader> {
        self.respond().await
    }
}

pub struct BrokenCache;

#[async_trait]
impl Cache for BrokenCache {
    async fn get(&self, _key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
        Err(CacheError::Backend("connection reset".to_string()))
    }

    async fn set(&self, _key: &CacheKey, _value: Vec<u8>) -> CacheResult<()> {
        Err(CacheError::Backend("connection reset".to_string()))
    }
}

/// One event stored in a temp directory, an in-memory bus and metadata store.
pub struct Fixture {
    pub dir: TempDir,
    pub metadata: InMemoryMetadataStore,
    pub bus: Arc<InMemoryBus>,
}

impl Fixture {
    pub fn new(event_id: EventId, cache_enabled: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let metadata = InMemoryMetadataStore::new();
        metadata.insert_event(event(event_id, dir.path(), cache_enabled));
        // Long delay so a nak is observed once per test.
        let bus = Arc::new(InMemoryBus::new().with_redelivery_delay(Duration::from_secs(60)));
        Self { dir, metadata, bus }
    }

    pub async fn add_asset(&self, event_id: EventId, id: &str, name: &str, kind: MediaKind) {
        self.metadata
            .add_media_asset(&MediaAsset {
                id: id.to_string(),
                event_id,
                name: name.to_string(),
                kind,
            })
            .await
            .unwrap();
    }

    pub fn processor(
        &self,
        generator: Arc<dyn ThumbnailGenerator>,
        cache: Option<Arc<dyn Cache>>,
        dedupe_by_source: bool,
    ) -> Arc<ThumbnailProcessor> {
        Arc::new(ThumbnailProcessor::new(
            Arc::new(self.metadata.clone()),
            generator,
            self.bus.clone(),
            cache,
            &pool_config(1, dedupe_by_source),
        ))
    }

    pub fn stored(&self, name: &str) -> Option<Vec<u8>> {
        std::fs::read(self.dir.path().join(name)).ok()
    }
}

pub fn event(id: EventId, dir: &Path, cache_enabled: bool) -> Event {
    Event {
        id,
        name: format!("Event {}", id),
        live: true,
        storage: StorageDescriptor::Filesystem(FilesystemConfig {
            directory: dir.to_string_lossy().into_owned(),
        }),
        cache_enabled,
    }
}

pub fn pool_config(workers: usize, dedupe_by_source: bool) -> WorkerPoolConfig {
    WorkerPoolConfig {
        workers,
        queue_group: "thumbnailer".to_string(),
        internal_server_url: INTERNAL_URL.to_string(),
        dedupe_by_source,
        receive_backoff: Duration::from_millis(10),
    }
}

pub fn new_media(event_id: EventId, file_id: &str, kind: MediaKind) -> Vec<u8> {
    NewMedia {
        event_id,
        file_id: file_id.to_string(),
        kind,
    }
    .to_payload()
    .unwrap()
}

/// Receive the next message within five seconds, ack it and return its payload.
pub async fn next_payload(subscription: &mut Subscription) -> Vec<u8> {
    let delivery = tokio::time::timeout(Duration::from_secs(5), subscription.next())
        .await
        .expect("timed out waiting for a message")
        .expect("subscription ended")
        .expect("receive failed");
    let payload = delivery.payload().to_vec();
    delivery.ack().await.unwrap();
    payload
}

/// True if nothing arrives within 200ms.
pub async fn stays_quiet(subscription: &mut Subscription) -> bool {
    tokio::time::timeout(Duration::from_millis(200), subscription.next())
        .await
        .is_err()
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}
