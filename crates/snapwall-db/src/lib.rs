//! Snapwall metadata store
//!
//! Events, uploaded originals and thumbnail records. The pipeline only depends on
//! the [`MetadataStore`] contract; [`PgMetadataStore`] is the production
//! implementation and [`InMemoryMetadataStore`] serves tests and single-process use.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use memory::InMemoryMetadataStore;
pub use postgres::PgMetadataStore;
pub use store::MetadataStore;
