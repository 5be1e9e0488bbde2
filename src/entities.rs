//! Entity adapters: render coordinator snapshots as host-platform entities.
//!
//! Nothing here fails loudly. When there is no current asset, or the last
//! refresh failed, entities report `available: false` with a null state
//! and no attributes.

use immich_api::{Asset, MediaPayload};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::Configuration;
use crate::slideshow::{Coordinator, SlideshowSnapshot};

#[derive(Debug, Clone, Serialize)]
pub struct EntityState {
    pub unique_id: String,
    pub name: String,
    pub icon: &'static str,
    pub state: Value,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<&'static str>,
    pub attributes: Map<String, Value>,
}

/// Which rendition the camera downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageVariant {
    Thumbnail,
    Original,
}

impl ImageVariant {
    fn url<'a>(&self, asset: &'a Asset) -> &'a str {
        match self {
            Self::Thumbnail => &asset.thumbnail_url,
            Self::Original => &asset.original_url,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EntityNames {
    pub instance_id: String,
    pub name: String,
}

impl EntityNames {
    fn unique_id(&self, suffix: &str) -> String {
        format!("{}_{}", self.instance_id, suffix)
    }
}

#[derive(Debug, Clone)]
pub struct CameraImage {
    pub asset_id: String,
    pub payload: MediaPayload,
}

/// Camera plus the two sensors for one configured slideshow.
#[derive(Debug)]
pub struct SlideshowEntities {
    coordinator: Coordinator,
    names: EntityNames,
    variant: ImageVariant,
    image_cache: Mutex<Option<CameraImage>>,
}

impl SlideshowEntities {
    pub const CAMERA: &'static str = "slideshow_camera";
    pub const CURRENT_IMAGE: &'static str = "current_image";
    pub const IMAGE_COUNT: &'static str = "image_count";

    pub fn new(coordinator: Coordinator, names: EntityNames, variant: ImageVariant) -> Self {
        Self {
            coordinator,
            names,
            variant,
            image_cache: Mutex::new(None),
        }
    }

    pub fn from_config(coordinator: Coordinator, cfg: &Configuration) -> Self {
        let variant = if cfg.use_thumbnails {
            ImageVariant::Thumbnail
        } else {
            ImageVariant::Original
        };
        let names = EntityNames {
            instance_id: cfg.instance_id.clone(),
            name: cfg.name.clone(),
        };
        Self::new(coordinator, names, variant)
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn states(&self) -> Vec<EntityState> {
        let snapshot = self.coordinator.snapshot();
        vec![
            self.camera_state(&snapshot),
            self.current_image_state(&snapshot),
            self.image_count_state(&snapshot),
        ]
    }

    pub fn state(&self, unique_id: &str) -> Option<EntityState> {
        self.states()
            .into_iter()
            .find(|entity| entity.unique_id == unique_id)
    }

    pub fn camera_state(&self, snapshot: &SlideshowSnapshot) -> EntityState {
        let available = snapshot.is_available();
        let attributes = match &snapshot.current {
            Some(asset) if available => object(json!({
                "current_image_id": asset.id,
                "filename": asset.filename,
                "current_index": snapshot.index,
                "total_images": snapshot.count,
                "image_url": asset.original_url,
                "thumbnail_url": asset.thumbnail_url,
                "in_live_mode": snapshot.in_live_mode,
                "history_index": snapshot.history_index.map_or(-1, |idx| idx as i64),
                "history_length": snapshot.history_length,
                "navigation_mode": snapshot.navigation_mode,
            })),
            _ => Map::new(),
        };
        EntityState {
            unique_id: self.names.unique_id(Self::CAMERA),
            name: self.names.name.clone(),
            icon: "mdi:camera",
            state: if available { json!("idle") } else { Value::Null },
            available,
            unit_of_measurement: None,
            attributes,
        }
    }

    pub fn current_image_state(&self, snapshot: &SlideshowSnapshot) -> EntityState {
        let available = snapshot.is_available();
        let (state, attributes) = match &snapshot.current {
            Some(asset) if available => (
                json!(asset.id),
                object(json!({
                    "image_url": asset.original_url,
                    "thumbnail_url": asset.thumbnail_url,
                    "filename": asset.filename,
                    "file_created_at": asset.file_created_at,
                    "file_modified_at": asset.file_modified_at,
                    "device_id": asset.device_id,
                    "type": asset.kind,
                    "current_index": snapshot.index,
                    "total_images": snapshot.count,
                })),
            ),
            _ => (Value::Null, Map::new()),
        };
        EntityState {
            unique_id: self.names.unique_id(Self::CURRENT_IMAGE),
            name: format!("{} Current Image", self.names.name),
            icon: "mdi:image",
            state,
            available,
            unit_of_measurement: None,
            attributes,
        }
    }

    pub fn image_count_state(&self, snapshot: &SlideshowSnapshot) -> EntityState {
        EntityState {
            unique_id: self.names.unique_id(Self::IMAGE_COUNT),
            name: format!("{} Image Count", self.names.name),
            icon: "mdi:counter",
            state: json!(snapshot.count),
            available: snapshot.last_refresh_succeeded(),
            unit_of_measurement: Some("images"),
            attributes: Map::new(),
        }
    }

    /// Bytes for the current asset, downloaded once per asset id.
    /// `None` whenever the camera entity is unavailable.
    pub async fn camera_image(&self) -> Option<CameraImage> {
        let snapshot = self.coordinator.snapshot();
        if !snapshot.is_available() {
            return None;
        }
        let asset = snapshot.current?;
        let mut cache = self.image_cache.lock().await;
        if let Some(cached) = cache.as_ref().filter(|c| c.asset_id == asset.id) {
            debug!(asset = %asset.id, "serving cached camera image");
            return Some(cached.clone());
        }

        let url = self.variant.url(&asset);
        match self.coordinator.source().fetch_media(url).await {
            Ok(payload) => {
                debug!(
                    asset = %asset.id,
                    bytes = payload.bytes.len(),
                    "fetched camera image"
                );
                let image = CameraImage {
                    asset_id: asset.id.clone(),
                    payload,
                };
                *cache = Some(image.clone());
                Some(image)
            }
            Err(err) => {
                warn!(asset = %asset.id, %url, error = %err, "failed to fetch camera image");
                None
            }
        }
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
