use std::path::PathBuf;
use thiserror::Error;

/// Errors raised outside the core transform.
///
/// Scanning, selection, extraction, mapping and feature building never
/// fail; only loading inputs from disk and the configuration checks do.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("missing required environment variables: {}", missing.join(", "))]
    MissingEnv { missing: Vec<String> },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid bounding box: west={west}, south={south}, east={east}, north={north}")]
    InvalidBounds {
        west: f64,
        south: f64,
        east: f64,
        north: f64,
    },
    #[error("tile metadata has no usable bbox_wgs84")]
    MissingBounds,
    #[error("tile metadata status is {0:?}")]
    TileNotReady(String),
    #[error("unsupported image container")]
    UnsupportedImage,
    #[error("image header is truncated")]
    TruncatedImage,
}

impl GeoError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Configuration errors abort before any transform work.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingEnv { .. })
    }
}

pub type Result<T> = std::result::Result<T, GeoError>;
