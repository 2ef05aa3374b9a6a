use crate::error::{GeoError, Result};
use crate::geo::{GeoBounds, ImageSize};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Georeference for one source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileMetadata {
    pub bounds: GeoBounds,
    /// Present when the ingest step recorded the output size.
    pub image_size: Option<ImageSize>,
}

#[derive(Debug, Deserialize)]
struct TileMetadataFile {
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "bbox_used")]
    bbox_wgs84: Option<BboxField>,
    /// Read leniently: a malformed size must not discard a valid bbox.
    #[serde(default)]
    image_px: Option<Value>,
}

/// Both encodings written by ingest scripts.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BboxField {
    Named {
        west: f64,
        south: f64,
        east: f64,
        north: f64,
    },
    /// `[minLon, minLat, maxLon, maxLat]`
    Ordered([f64; 4]),
}

impl TileMetadata {
    pub fn from_value(value: &Value) -> Result<Self> {
        let file = TileMetadataFile::deserialize(value)
            .map_err(|e| GeoError::json("<tile metadata>", e))?;

        if let Some(status) = file.status.filter(|s| s != "ok") {
            return Err(GeoError::TileNotReady(status));
        }

        let bounds = match file.bbox_wgs84.ok_or(GeoError::MissingBounds)? {
            BboxField::Named {
                west,
                south,
                east,
                north,
            } => GeoBounds::new(west, south, east, north)?,
            BboxField::Ordered([west, south, east, north]) => {
                GeoBounds::new(west, south, east, north)?
            }
        };

        let image_size = file.image_px.as_ref().and_then(image_px_size);
        if file.image_px.is_some() && image_size.is_none() {
            log::warn!("ignoring unusable image_px in tile metadata");
        }

        Ok(Self { bounds, image_size })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GeoError::io(path, e))?;
        let value: Value = serde_json::from_str(&content).map_err(|e| GeoError::json(path, e))?;
        Self::from_value(&value)
    }
}

fn image_px_size(px: &Value) -> Option<ImageSize> {
    let dimension = |key: &str| u32::try_from(px.get(key)?.as_u64()?).ok();
    ImageSize::new(dimension("width")?, dimension("height")?)
}
