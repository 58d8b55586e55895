//! Shared key helpers for storage backends.

use crate::traits::{StorageError, StorageResult};
use std::path::Path;
use uuid::Uuid;

/// Mint a fresh blob key for `name`, keeping its extension (lowercased).
///
/// `holiday.JPG` becomes `{uuid}.jpg`; names without an extension get a bare UUID.
pub fn unique_key(name: &str) -> String {
    let id = Uuid::new_v4();
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{}.{}", id, ext.to_lowercase()),
        _ => id.to_string(),
    }
}

/// Reject keys that could escape the backend's directory.
pub fn validate_flat_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key == "." || key == ".." || key.contains('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}
