//! Snapwall Core Library
//!
//! This crate provides the domain models, bus message payloads, the pipeline error
//! taxonomy and configuration shared by every Snapwall component.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{CacheMode, Config, LogFormat};
pub use error::{ErrorKind, PipelineError, PipelineState};
pub use models::*;
pub use storage_types::StorageKind;
