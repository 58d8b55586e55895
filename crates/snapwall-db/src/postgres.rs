//! Postgres-backed metadata store

use crate::{MetadataError, MetadataResult, MetadataStore};
use async_trait::async_trait;
use snapwall_core::{Event, EventId, MediaAsset, MediaKind, StorageSlots, ThumbnailAsset};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: i64,
    name: String,
    live: bool,
    cache_enabled: bool,
    storage: Json<StorageSlots>,
}

impl EventRow {
    fn into_event(self) -> MetadataResult<Event> {
        let event_id = event_id_from_db(self.id)?;
        let storage = self
            .storage
            .0
            .resolve()
            .map_err(|source| MetadataError::InvalidStorage { event_id, source })?;
        Ok(Event {
            id: event_id,
            name: self.name,
            live: self.live,
            storage,
            cache_enabled: self.cache_enabled,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MediaAssetRow {
    id: String,
    event_id: i64,
    name: String,
    kind: String,
}

impl MediaAssetRow {
    fn into_asset(self) -> MetadataResult<MediaAsset> {
        let kind = self
            .kind
            .parse::<MediaKind>()
            .map_err(MetadataError::InvalidRecord)?;
        Ok(MediaAsset {
            id: self.id,
            event_id: event_id_from_db(self.event_id)?,
            name: self.name,
            kind,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ThumbnailAssetRow {
    id: String,
    name: String,
    event_id: i64,
    source_asset_id: String,
}

impl ThumbnailAssetRow {
    fn into_thumbnail(self) -> MetadataResult<ThumbnailAsset> {
        Ok(ThumbnailAsset {
            id: self.id,
            name: self.name,
            event_id: event_id_from_db(self.event_id)?,
            source_asset_id: self.source_asset_id,
        })
    }
}

fn event_id_from_db(id: i64) -> MetadataResult<EventId> {
    EventId::try_from(id).map_err(|_| MetadataError::InvalidRecord(format!("negative event id {}", id)))
}

fn event_id_to_db(id: EventId) -> MetadataResult<i64> {
    i64::try_from(id).map_err(|_| MetadataError::InvalidRecord(format!("event id {} out of range", id)))
}

#[derive(Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> MetadataResult<Self> {
        tracing::info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        tracing::info!(max_connections, "Database connected successfully");
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema.
    pub async fn migrate(&self) -> MetadataResult<()> {
        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        let migrator = sqlx::migrate::Migrator::new(migrations_dir)
            .await
            .map_err(|e| MetadataError::Database(e.into()))?;
        migrator
            .run(&self.pool)
            .await
            .map_err(|e| MetadataError::Database(e.into()))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    #[tracing::instrument(skip(self), fields(db.table = "events", db.record_id = id))]
    async fn get_event(&self, id: EventId) -> MetadataResult<Event> {
        let row: Option<EventRow> = sqlx::query_as::<Postgres, EventRow>(
            "SELECT id, name, live, cache_enabled, storage FROM events WHERE id = $1",
        )
        .bind(event_id_to_db(id)?)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| MetadataError::not_found("event", id))?
            .into_event()
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_assets", db.record_id = %id))]
    async fn get_media_asset(&self, id: &str) -> MetadataResult<MediaAsset> {
        let row: Option<MediaAssetRow> = sqlx::query_as::<Postgres, MediaAssetRow>(
            "SELECT id, event_id, name, kind FROM media_assets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| MetadataError::not_found("media asset", id))?
            .into_asset()
    }

    #[tracing::instrument(skip(self, asset), fields(db.table = "media_assets", db.record_id = %asset.id))]
    async fn add_media_asset(&self, asset: &MediaAsset) -> MetadataResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO media_assets (id, event_id, name, kind)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&asset.id)
        .bind(event_id_to_db(asset.event_id)?)
        .bind(&asset.name)
        .bind(asset.kind.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 && self.get_media_asset(&asset.id).await? != *asset {
            return Err(MetadataError::conflict("media asset", &asset.id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, thumbnail), fields(db.table = "thumbnail_assets", db.record_id = %thumbnail.id))]
    async fn add_thumbnail_asset(&self, thumbnail: &ThumbnailAsset) -> MetadataResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO thumbnail_assets (id, name, event_id, source_asset_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&thumbnail.id)
        .bind(&thumbnail.name)
        .bind(event_id_to_db(thumbnail.event_id)?)
        .bind(&thumbnail.source_asset_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0
            && self.get_thumbnail_asset(&thumbnail.id).await? != *thumbnail
        {
            return Err(MetadataError::conflict("thumbnail", &thumbnail.id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "thumbnail_assets", db.record_id = %id))]
    async fn get_thumbnail_asset(&self, id: &str) -> MetadataResult<ThumbnailAsset> {
        let row: Option<ThumbnailAssetRow> = sqlx::query_as::<Postgres, ThumbnailAssetRow>(
            "SELECT id, name, event_id, source_asset_id FROM thumbnail_assets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| MetadataError::not_found("thumbnail", id))?
            .into_thumbnail()
    }

    #[tracing::instrument(skip(self), fields(db.table = "thumbnail_assets"))]
    async fn find_thumbnail_for_source(
        &self,
        event_id: EventId,
        source_asset_id: &str,
    ) -> MetadataResult<Option<ThumbnailAsset>> {
        let row: Option<ThumbnailAssetRow> = sqlx::query_as::<Postgres, ThumbnailAssetRow>(
            r#"
            SELECT id, name, event_id, source_asset_id
            FROM thumbnail_assets
            WHERE event_id = $1 AND source_asset_id = $2
            LIMIT 1
            "#,
        )
        .bind(event_id_to_db(event_id)?)
        .bind(source_asset_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ThumbnailAssetRow::into_thumbnail).transpose()
    }
}
