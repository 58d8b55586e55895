//! Data models shared across Snapwall crates
//!
//! Events and their storage configuration, media and thumbnail records, cache
//! keys and the payloads carried on the event bus.

mod event;
mod media;
mod messages;
mod storage;

pub use event::*;
pub use media::*;
pub use messages::*;
pub use storage::*;
