//! Snapwall Processing Library
//!
//! Thumbnail generation. Rendering is delegated to an external imagor service;
//! [`ImagorClient`] asks it for a preview of a URL and streams back the result.

pub mod generator;
pub mod imagor;

pub use generator::{GeneratorError, GeneratorResult, ThumbnailGenerator};
pub use imagor::ImagorClient;
