use anyhow::Context;
use snapwall_core::Config;
use snapwall_db::PgMetadataStore;
use snapwall_infra::{create_cache, init_telemetry, EventBus, RedisBusConfig, RedisStreamsBus};
use snapwall_processing::ImagorClient;
use snapwall_worker::{ThumbnailProcessor, ThumbnailWorkerPool, WorkerPoolConfig};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_telemetry("snapwall=info", config.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment,
        workers = config.thumbnailer_workers,
        cache_mode = %config.cache_mode,
        "Starting snapwall thumbnailer"
    );

    let metadata = PgMetadataStore::connect(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to connect to database")?;
    metadata.migrate().await.context("Failed to run migrations")?;

    let bus: Arc<dyn EventBus> = Arc::new(
        RedisStreamsBus::connect(
            &config.redis_url,
            RedisBusConfig {
                ack_wait: Duration::from_secs(config.bus_ack_wait_secs),
                ..Default::default()
            },
        )
        .await
        .context("Failed to connect to Redis event bus")?,
    );

    let cache = create_cache(
        config.cache_mode,
        &config.redis_url,
        config.cache_capacity,
        Duration::from_secs(config.cache_ttl_secs),
    )
    .await
    .context("Failed to initialize cache")?;

    let generator = ImagorClient::new(&config.imagor_url).context("Failed to build imagor client")?;

    let pool_config = WorkerPoolConfig {
        workers: config.thumbnailer_workers,
        queue_group: config.thumbnailer_queue_group.clone(),
        internal_server_url: config.internal_server_url.clone(),
        dedupe_by_source: config.thumbnail_dedupe,
        ..Default::default()
    };

    let processor = Arc::new(ThumbnailProcessor::new(
        Arc::new(metadata),
        Arc::new(generator),
        bus.clone(),
        cache,
        &pool_config,
    ));

    let pool = ThumbnailWorkerPool::start(processor, bus, &pool_config)
        .await
        .context("Failed to start worker pool")?;

    shutdown_signal().await;
    pool.shutdown().await;

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }
}
