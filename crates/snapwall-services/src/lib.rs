//! Snapwall Services Layer
//!
//! The guest-facing side of the pipeline: accepting uploads into an event's
//! storage and serving originals and thumbnails back through the cache.

pub mod error;
pub mod media;
pub mod upload;

pub use error::{ServiceError, ServiceResult};
pub use media::MediaService;
pub use upload::UploadService;
