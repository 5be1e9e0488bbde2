use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Media type reported by Immich. Anything unrecognised becomes `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetKind {
    Image,
    Video,
    Audio,
    #[default]
    #[serde(other)]
    Other,
}

/// One media item known to the server, with its media URLs resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    pub id: String,
    pub filename: String,
    pub kind: AssetKind,
    pub thumbnail_url: String,
    pub original_url: String,
    pub file_created_at: Option<DateTime<Utc>>,
    pub file_modified_at: Option<DateTime<Utc>>,
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumSummary {
    pub id: String,
    pub name: String,
    pub asset_count: u64,
}

/// Rendition requested from `/api/assets/{id}/thumbnail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThumbnailSize {
    #[default]
    Preview,
    Thumbnail,
}

impl ThumbnailSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preview => "preview",
            Self::Thumbnail => "thumbnail",
        }
    }
}

/// Downloaded media bytes plus the content type the server reported.
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssetResponse {
    pub id: String,
    #[serde(default)]
    pub original_file_name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: AssetKind,
    #[serde(default)]
    pub file_created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AlbumResponse {
    pub id: String,
    #[serde(default)]
    pub album_name: Option<String>,
    #[serde(default)]
    pub asset_count: u64,
    #[serde(default)]
    pub assets: Vec<AssetResponse>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PingResponse {
    pub res: String,
}
