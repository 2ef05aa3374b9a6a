use crate::builder::{FeatureBuilder, summary_fields};
use crate::extract::extract_all;
use crate::geo::ImageSize;
use crate::scan::scan;
use crate::schema::{FeatureCollection, RunCounts, RunStatus};
use crate::select::select_best;
use crate::tile::TileMetadata;
use serde_json::Value;

/// Stages a transform passes through once its input is ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Ingested,
    Scanned,
    Geocoded,
    Written,
    DegradedWritten,
}

/// Result of transforming one inference result.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeOutcome {
    pub collection: FeatureCollection,
    pub status: RunStatus,
    pub state: RunState,
    pub counts: RunCounts,
    pub fallback: bool,
    /// Why the run degraded, if it did.
    pub diagnostic: Option<String>,
}

/// Scan → select → extract → map → build.
///
/// Stateless: identical inputs always give identical collections.
#[derive(Debug, Clone, Default)]
pub struct GeocodeEngine {
    builder: FeatureBuilder,
}

impl GeocodeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(mut self, builder: FeatureBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Transform `result` into a FeatureCollection.
    ///
    /// `size` overrides any size recorded in the tile metadata.
    pub fn geocode(
        &self,
        result: &Value,
        tile: Option<&TileMetadata>,
        size: Option<ImageSize>,
    ) -> GeocodeOutcome {
        let mut state = RunState::Ingested;
        log::debug!("run state: {:?}", state);

        let candidates = scan(result);
        let winner = select_best(&candidates).map(|(_, candidate)| candidate);
        let extraction = match winner {
            Some(candidate) => extract_all(candidate.entries.iter().copied()),
            None => Default::default(),
        };
        state = RunState::Scanned;
        log::debug!("run state: {:?}", state);

        let bounds = tile.map(|t| &t.bounds);
        let size = size.or_else(|| tile.and_then(|t| t.image_size));
        let summary = summary_fields(result);

        let diagnostic = match (bounds, size) {
            (Some(_), Some(_)) => None,
            (None, _) => Some("tile metadata with a valid bbox_wgs84 is unavailable".to_string()),
            (Some(_), None) => Some("image dimensions are unavailable".to_string()),
        };

        if diagnostic.is_none() {
            for detection in &extraction.detections {
                if let Some(size) = size
                    && (detection.x < 0.0
                        || detection.y < 0.0
                        || detection.x > f64::from(size.width)
                        || detection.y > f64::from(size.height))
                {
                    log::debug!(
                        "pixel ({}, {}) lies outside the {}x{} image",
                        detection.x,
                        detection.y,
                        size.width,
                        size.height
                    );
                }
            }
            state = RunState::Geocoded;
            log::debug!("run state: {:?}", state);
        }

        let built = self
            .builder
            .build(&extraction.detections, bounds, size, &summary);

        let counts = RunCounts {
            candidates_found: candidates.len(),
            predictions_found: winner.map(|c| c.len()).unwrap_or(0),
            features_written: built.collection.len(),
            dropped: extraction.dropped,
        };

        let (status, state) = match &diagnostic {
            None => (RunStatus::Ok, RunState::Written),
            Some(reason) => {
                log::warn!("georeference unavailable: {}", reason);
                (RunStatus::NeedsGeoreference, RunState::DegradedWritten)
            }
        };
        log::info!(
            "{} feature(s) from {} prediction(s) in {} candidate list(s), status {}",
            counts.features_written,
            counts.predictions_found,
            counts.candidates_found,
            status
        );

        GeocodeOutcome {
            collection: built.collection,
            status,
            state,
            counts,
            fallback: built.fallback,
            diagnostic,
        }
    }
}
