//! In-process metadata store

use crate::{MetadataError, MetadataResult, MetadataStore};
use async_trait::async_trait;
use snapwall_core::{Event, EventId, MediaAsset, ThumbnailAsset};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    events: HashMap<EventId, Event>,
    media: HashMap<String, MediaAsset>,
    thumbnails: HashMap<String, ThumbnailAsset>,
}

/// Metadata store kept in memory. Clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryMetadataStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register or replace an event.
    pub fn insert_event(&self, event: Event) {
        self.tables().events.insert(event.id, event);
    }

    pub fn thumbnails(&self) -> Vec<ThumbnailAsset> {
        let mut thumbnails: Vec<_> = self.tables().thumbnails.values().cloned().collect();
        thumbnails.sort_by(|a, b| a.id.cmp(&b.id));
        thumbnails
    }

    pub fn media_assets(&self) -> Vec<MediaAsset> {
        let mut media: Vec<_> = self.tables().media.values().cloned().collect();
        media.sort_by(|a, b| a.id.cmp(&b.id));
        media
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn get_event(&self, id: EventId) -> MetadataResult<Event> {
        self.tables()
            .events
            .get(&id)
            .cloned()
            .ok_or_else(|| MetadataError::not_found("event", id))
    }

    async fn get_media_asset(&self, id: &str) -> MetadataResult<MediaAsset> {
        self.tables()
            .media
            .get(id)
            .cloned()
            .ok_or_else(|| MetadataError::not_found("media asset", id))
    }

    async fn add_media_asset(&self, asset: &MediaAsset) -> MetadataResult<()> {
        let mut tables = self.tables();
        if !tables.events.contains_key(&asset.event_id) {
            return Err(MetadataError::not_found("event", asset.event_id));
        }
        match tables.media.get(&asset.id) {
            Some(existing) if existing != asset => {
                Err(MetadataError::conflict("media asset", &asset.id))
            }
            Some(_) => Ok(()),
            None => {
                tables.media.insert(asset.id.clone(), asset.clone());
                Ok(())
            }
        }
    }

    async fn add_thumbnail_asset(&self, thumbnail: &ThumbnailAsset) -> MetadataResult<()> {
        let mut tables = self.tables();
        if !tables.events.contains_key(&thumbnail.event_id) {
            return Err(MetadataError::not_found("event", thumbnail.event_id));
        }
        match tables.thumbnails.get(&thumbnail.id) {
            Some(existing) if existing != thumbnail => {
                Err(MetadataError::conflict("thumbnail", &thumbnail.id))
            }
            Some(_) => Ok(()),
            None => {
                tables
                    .thumbnails
                    .insert(thumbnail.id.clone(), thumbnail.clone());
                Ok(())
            }
        }
    }

    async fn get_thumbnail_asset(&self, id: &str) -> MetadataResult<ThumbnailAsset> {
        self.tables()
            .thumbnails
            .get(id)
            .cloned()
            .ok_or_else(|| MetadataError::not_found("thumbnail", id))
    }

    async fn find_thumbnail_for_source(
        &self,
        event_id: EventId,
        source_asset_id: &str,
    ) -> MetadataResult<Option<ThumbnailAsset>> {
        Ok(self
            .tables()
            .thumbnails
            .values()
            .find(|t| t.event_id == event_id && t.source_asset_id == source_asset_id)
            .cloned())
    }
}
