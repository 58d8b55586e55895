use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::event::EventId;

/// Media kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Map an upload's declared content type to a media kind.
    ///
    /// Returns `None` for anything the gallery cannot render.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "image/png" | "image/jpeg" | "image/heif" => Some(MediaKind::Image),
            "video/avi" | "video/mp4" | "video/mpeg" | "video/webm" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaKind::Image => write!(f, "IMAGE"),
            MediaKind::Video => write!(f, "VIDEO"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IMAGE" => Ok(MediaKind::Image),
            "VIDEO" => Ok(MediaKind::Video),
            _ => Err(format!("Invalid media kind: {}", s)),
        }
    }
}

/// An uploaded original. `id` is the identifier assigned by the event's storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    pub id: String,
    pub event_id: EventId,
    pub name: String,
    pub kind: MediaKind,
}

/// A generated preview of a [`MediaAsset`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailAsset {
    pub id: String,
    pub name: String,
    pub event_id: EventId,
    pub source_asset_id: String,
}

/// Thumbnail file name for an original: `file.jpg` becomes `thumb_file.webp`.
pub fn thumbnail_name_for(original_name: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("media");
    format!("thumb_{}.webp", stem)
}

/// Cache key for a stored blob
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub event_id: EventId,
    pub asset_id: String,
}

impl CacheKey {
    pub fn new(event_id: EventId, asset_id: impl Into<String>) -> Self {
        Self {
            event_id,
            asset_id: asset_id.into(),
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.event_id, self.asset_id)
    }
}
