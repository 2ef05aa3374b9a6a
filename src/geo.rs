use crate::error::{GeoError, Result};
use serde::{Deserialize, Serialize};

/// Axis-aligned WGS84 rectangle. Always ordered once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        let finite = [west, south, east, north].iter().all(|v| v.is_finite());
        if !finite || west >= east || south >= north {
            return Err(GeoError::InvalidBounds {
                west,
                south,
                east,
                north,
            });
        }
        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }

    pub fn centroid(&self) -> (f64, f64) {
        (
            (self.west + self.east) / 2.0,
            (self.south + self.north) / 2.0,
        )
    }
}

/// Pixel dimensions of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    /// `None` when either dimension is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }
}

/// Map a pixel position to (lon, lat).
///
/// Linear interpolation in degrees over a north-up, unrotated image. Only
/// adequate for small boxes; pixels outside the image extrapolate.
pub fn to_lon_lat(x: f64, y: f64, size: ImageSize, bounds: &GeoBounds) -> (f64, f64) {
    let width = f64::from(size.width.max(1));
    let height = f64::from(size.height.max(1));
    let lon = bounds.west + (x / width) * (bounds.east - bounds.west);
    let lat = bounds.north - (y / height) * (bounds.north - bounds.south);
    (lon, lat)
}
