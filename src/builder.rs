use crate::extract::PixelDetection;
use crate::geo::{GeoBounds, ImageSize, to_lon_lat};
use crate::schema::{Feature, FeatureCollection, SOURCE_DETECTION, SOURCE_SUMMARY};
use serde_json::{Map, Value, json};

/// Key suffixes (case-insensitive) of aggregate outputs kept on the fallback feature.
pub const SUMMARY_SUFFIXES: &[&str] = &["count", "group"];

/// The assembled output plus how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltCollection {
    pub collection: FeatureCollection,
    /// True when the only feature is the centroid summary marker.
    pub fallback: bool,
}

#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    fallback_marker: bool,
}

impl FeatureBuilder {
    pub fn new() -> Self {
        Self {
            fallback_marker: true,
        }
    }

    pub fn with_fallback_marker(mut self, enabled: bool) -> Self {
        self.fallback_marker = enabled;
        self
    }

    /// Assemble the FeatureCollection.
    ///
    /// Detections are only placed when both `bounds` and `size` are known.
    /// With zero placed detections, a valid bbox and at least one summary
    /// field, a single marker feature lands on the bbox centroid. Every other
    /// combination yields an empty collection.
    pub fn build(
        &self,
        detections: &[PixelDetection],
        bounds: Option<&GeoBounds>,
        size: Option<ImageSize>,
        summary: &Map<String, Value>,
    ) -> BuiltCollection {
        let Some(bounds) = bounds else {
            return BuiltCollection {
                collection: FeatureCollection::empty(),
                fallback: false,
            };
        };

        let features: Vec<Feature> = match size {
            Some(size) => detections
                .iter()
                .map(|d| detection_feature(d, size, bounds))
                .collect(),
            None => Vec::new(),
        };

        if !features.is_empty() {
            return BuiltCollection {
                collection: FeatureCollection {
                    features,
                    ..FeatureCollection::default()
                },
                fallback: false,
            };
        }

        if self.fallback_marker && !summary.is_empty() {
            let (lon, lat) = bounds.centroid();
            let mut properties = Map::new();
            properties.insert("source".into(), json!(SOURCE_SUMMARY));
            properties.insert("fallback".into(), json!(true));
            properties.extend(summary.clone());
            return BuiltCollection {
                collection: FeatureCollection {
                    features: vec![Feature::point(lon, lat, properties)],
                    ..FeatureCollection::default()
                },
                fallback: true,
            };
        }

        BuiltCollection {
            collection: FeatureCollection::empty(),
            fallback: false,
        }
    }
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn detection_feature(detection: &PixelDetection, size: ImageSize, bounds: &GeoBounds) -> Feature {
    let (lon, lat) = to_lon_lat(detection.x, detection.y, size, bounds);
    let mut properties = Map::new();
    if let Some(conf) = detection.confidence {
        properties.insert("conf".into(), json!(conf));
    }
    if let Some(class) = &detection.class {
        properties.insert("class".into(), json!(class));
    }
    properties.insert("source".into(), json!(SOURCE_DETECTION));
    properties.insert("rule".into(), json!(detection.rule));
    Feature::point(lon, lat, properties)
}

/// The object whose fields count as the result's top level.
///
/// Workflow responses arrive as a one-element array of outputs, so the
/// first element stands in for the root in that case.
pub fn top_level_object(root: &Value) -> Option<&Map<String, Value>> {
    match root {
        Value::Object(map) => Some(map),
        Value::Array(items) => items.first()?.as_object(),
        _ => None,
    }
}

/// Numeric top-level fields whose key ends in one of [`SUMMARY_SUFFIXES`].
pub fn summary_fields(root: &Value) -> Map<String, Value> {
    let Some(top) = top_level_object(root) else {
        return Map::new();
    };
    top.iter()
        .filter(|(key, value)| {
            let key = key.to_lowercase();
            value.is_number() && SUMMARY_SUFFIXES.iter().any(|s| key.ends_with(s))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
