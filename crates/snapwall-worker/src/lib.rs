//! Thumbnail worker pool
//!
//! Consumes "new media" notifications, asks the thumbnail generator for a
//! preview, stores it next to the original and announces it on the bus.
//!
//! Shutdown: [`ThumbnailWorkerPool::shutdown`] stops message acquisition, lets
//! in-flight messages finish and joins every worker task.

pub mod pool;
pub mod processor;
pub mod tee;

pub use pool::{ThumbnailWorkerPool, WorkerPoolConfig, WorkerStats};
pub use processor::{ProcessOutcome, ThumbnailProcessor};
pub use tee::{Captured, TeeReader, ThumbnailSource};
