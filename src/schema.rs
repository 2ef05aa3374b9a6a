use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureCollectionType {
    #[default]
    FeatureCollection,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureType {
    #[default]
    Feature,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryType {
    #[default]
    Point,
}

/// GeoJSON output of one run.
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: FeatureCollectionType,
    pub features: Vec<Feature>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: FeatureType,
    pub properties: Map<String, Value>,
    pub geometry: Geometry,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: GeometryType,
    /// `[lon, lat]`
    pub coordinates: [f64; 2],
}

impl FeatureCollection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Feature {
    pub fn point(lon: f64, lat: f64, properties: Map<String, Value>) -> Self {
        Self {
            kind: FeatureType::Feature,
            properties,
            geometry: Geometry {
                kind: GeometryType::Point,
                coordinates: [lon, lat],
            },
        }
    }
}

/// Where a feature came from.
pub const SOURCE_DETECTION: &str = "detection";
pub const SOURCE_SUMMARY: &str = "summary";

/// Diagnostic outcome of a run, written to `meta.json`.
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    NeedsGeoreference,
    NoInputImage,
    MissingEnv,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Ok => "ok",
            RunStatus::NeedsGeoreference => "needs_georeference",
            RunStatus::NoInputImage => "no_input_image",
            RunStatus::MissingEnv => "missing_env",
            RunStatus::Error => "error",
        }
    }

    /// Terminal states that still produced a map-safe output.
    pub fn is_degraded(&self) -> bool {
        matches!(self, RunStatus::NeedsGeoreference | RunStatus::NoInputImage)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters describing what the transform saw.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunCounts {
    pub candidates_found: usize,
    pub predictions_found: usize,
    pub features_written: usize,
    pub dropped: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RunMeta {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub counts: RunCounts,
    #[serde(default)]
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_env: Option<Vec<String>>,
    pub updated_utc: DateTime<Utc>,
}

impl RunMeta {
    pub fn new(status: RunStatus) -> Self {
        Self {
            status,
            message: None,
            counts: RunCounts::default(),
            fallback: false,
            input_image: None,
            missing_env: None,
            updated_utc: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
