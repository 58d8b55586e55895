//! Configuration module
//!
//! Process-level settings for the thumbnailer and upload services, read from the
//! environment (and an optional `.env` file). Constructors elsewhere receive the
//! values they need explicitly; nothing reads the environment after startup.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

const DB_MAX_CONNECTIONS: u32 = 10;
const THUMBNAILER_WORKERS: usize = 4;
const THUMBNAILER_QUEUE_GROUP: &str = "thumbnailer";
const BUS_ACK_WAIT_SECS: u64 = 30;
const CACHE_CAPACITY: usize = 512;
const CACHE_TTL_SECS: u64 = 3600;

/// Which cache implementation backs events that opt into caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    None,
    Memory,
    Redis,
}

impl FromStr for CacheMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "off" => Ok(CacheMode::None),
            "memory" | "mem" => Ok(CacheMode::Memory),
            "redis" => Ok(CacheMode::Redis),
            _ => Err(anyhow::anyhow!("Invalid cache mode: {}", s)),
        }
    }
}

impl Display for CacheMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CacheMode::None => write!(f, "none"),
            CacheMode::Memory => write!(f, "memory"),
            CacheMode::Redis => write!(f, "redis"),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub redis_url: String,
    /// Base URL of the imagor thumbnail service
    pub imagor_url: String,
    /// URL the thumbnail service uses to fetch originals from this deployment
    pub internal_server_url: String,
    pub thumbnailer_workers: usize,
    pub thumbnailer_queue_group: String,
    /// Seconds an unacknowledged bus message stays pending before redelivery
    pub bus_ack_wait_secs: u64,
    pub cache_mode: CacheMode,
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
    pub log_format: LogFormat,
    /// Skip regeneration when a thumbnail already exists for the source asset
    pub thumbnail_dedupe: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cache_mode = env::var("CACHE_MODE")
            .unwrap_or_else(|_| "none".to_string())
            .parse::<CacheMode>()?;

        let log_format = env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "text".to_string())
            .parse::<LogFormat>()?;

        let config = Config {
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DB_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DB_MAX_CONNECTIONS),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            imagor_url: env::var("IMAGOR_URL")
                .map_err(|_| anyhow::anyhow!("IMAGOR_URL must be set"))?,
            internal_server_url: env::var("INTERNAL_SERVER_URL")
                .map_err(|_| anyhow::anyhow!("INTERNAL_SERVER_URL must be set"))?,
            thumbnailer_workers: env::var("THUMBNAILER_WORKERS")
                .unwrap_or_else(|_| THUMBNAILER_WORKERS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("THUMBNAILER_WORKERS must be a valid number"))?,
            thumbnailer_queue_group: env::var("THUMBNAILER_QUEUE_GROUP")
                .unwrap_or_else(|_| THUMBNAILER_QUEUE_GROUP.to_string()),
            bus_ack_wait_secs: env::var("BUS_ACK_WAIT_SECS")
                .unwrap_or_else(|_| BUS_ACK_WAIT_SECS.to_string())
                .parse()
                .unwrap_or(BUS_ACK_WAIT_SECS),
            cache_mode,
            cache_capacity: env::var("CACHE_CAPACITY")
                .unwrap_or_else(|_| CACHE_CAPACITY.to_string())
                .parse()
                .unwrap_or(CACHE_CAPACITY),
            cache_ttl_secs: env::var("CACHE_TTL_SECS")
                .unwrap_or_else(|_| CACHE_TTL_SECS.to_string())
                .parse()
                .unwrap_or(CACHE_TTL_SECS),
            log_format,
            thumbnail_dedupe: env::var("THUMBNAIL_DEDUPE")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
        };

        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a postgres:// or postgresql:// URL"
            ));
        }

        for (name, url) in [
            ("IMAGOR_URL", &self.imagor_url),
            ("INTERNAL_SERVER_URL", &self.internal_server_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow::anyhow!("{} must be an http(s) URL", name));
            }
        }

        if !self.redis_url.starts_with("redis://") && !self.redis_url.starts_with("rediss://") {
            return Err(anyhow::anyhow!("REDIS_URL must be a redis:// or rediss:// URL"));
        }

        if self.thumbnailer_workers == 0 {
            return Err(anyhow::anyhow!("THUMBNAILER_WORKERS must be at least 1"));
        }

        if self.bus_ack_wait_secs == 0 {
            return Err(anyhow::anyhow!("BUS_ACK_WAIT_SECS must be at least 1"));
        }

        if self.cache_mode == CacheMode::Memory && self.cache_capacity == 0 {
            return Err(anyhow::anyhow!(
                "CACHE_CAPACITY must be at least 1 when CACHE_MODE=memory"
            ));
        }

        Ok(())
    }
}
