//! One run over a working directory: read the materialized inference result,
//! geocode it and write the map-facing outputs plus a status record.

use crate::artifacts::{InferenceSummary, find_embedded_image, strip_embedded_images};
use crate::builder::FeatureBuilder;
use crate::config::GeoConfig;
use crate::engine::{GeocodeEngine, GeocodeOutcome};
use crate::error::{GeoError, Result};
use crate::imagesize::read_dimensions;
use crate::schema::{FeatureCollection, RunMeta, RunStatus};
use crate::tile::TileMetadata;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DETECTIONS_FILE: &str = "detections.geojson";
pub const META_FILE: &str = "meta.json";
pub const SUMMARY_FILE: &str = "inference_summary.json";

/// Everything a run reads from the outside world.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub root: PathBuf,
    pub config: GeoConfig,
    pub env: HashMap<String, String>,
}

impl RunContext {
    pub fn new(root: impl Into<PathBuf>, config: GeoConfig) -> Self {
        Self {
            root: root.into(),
            config,
            env: std::env::vars().collect(),
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.config.paths.output_dir)
    }

    /// First configured image name present in the input directory.
    pub fn find_image(&self) -> Option<PathBuf> {
        let input_dir = self.resolve(&self.config.paths.input_dir);
        self.config
            .paths
            .image_names
            .iter()
            .map(|name| input_dir.join(name))
            .find(|path| path.is_file())
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub meta: RunMeta,
    pub outcome: Option<GeocodeOutcome>,
    pub output_dir: PathBuf,
}

/// Execute a run. Degraded outcomes are `Ok`; configuration errors and an
/// unreadable inference result are returned as errors after `meta.json`
/// has been written.
pub fn run(ctx: &RunContext) -> Result<RunReport> {
    let output_dir = ctx.output_dir();
    std::fs::create_dir_all(&output_dir).map_err(|e| GeoError::io(&output_dir, e))?;
    let pretty = ctx.config.output.pretty;

    // The map must always find a valid file, whatever happens below.
    save_json(
        &output_dir.join(DETECTIONS_FILE),
        &FeatureCollection::empty(),
        pretty,
    )?;

    let missing = ctx.config.missing_env(&ctx.env);
    if !missing.is_empty() {
        let mut meta = RunMeta::new(RunStatus::MissingEnv)
            .with_message(format!("Missing env vars: {}", missing.join(", ")));
        meta.missing_env = Some(missing.clone());
        save_json(&output_dir.join(META_FILE), &meta, pretty)?;
        return Err(GeoError::MissingEnv { missing });
    }

    let Some(image_path) = ctx.find_image() else {
        let meta = RunMeta::new(RunStatus::NoInputImage).with_message(format!(
            "Place an image at {} ({}) then rerun.",
            ctx.config.paths.input_dir.display(),
            ctx.config.paths.image_names.join(", ")
        ));
        log::warn!("no input image found");
        save_json(&output_dir.join(META_FILE), &meta, pretty)?;
        return Ok(RunReport {
            meta,
            outcome: None,
            output_dir,
        });
    };
    let input_image = display_relative(&image_path, &ctx.root);

    let result = match load_inference_result(&ctx.resolve(&ctx.config.paths.inference_result)) {
        Ok(result) => result,
        Err(e) => return record_failure(&output_dir, &input_image, e, pretty),
    };

    let tile = match TileMetadata::load(&ctx.resolve(&ctx.config.paths.tile_meta)) {
        Ok(tile) => Some(tile),
        Err(e) => {
            log::warn!("tile metadata unusable: {}", e);
            None
        }
    };
    let size = tile.as_ref().and_then(|t| t.image_size).or_else(|| {
        read_dimensions(&image_path)
            .map_err(|e| log::warn!("cannot read size of {}: {}", image_path.display(), e))
            .ok()
    });

    let engine = GeocodeEngine::new().with_builder(
        FeatureBuilder::new().with_fallback_marker(ctx.config.output.fallback_marker),
    );
    let outcome = engine.geocode(&result, tile.as_ref(), size);

    if let Err(e) = write_artifacts(
        ctx,
        &result,
        &output_dir,
        &input_image,
        outcome.counts.predictions_found,
    ) {
        return record_failure(&output_dir, &input_image, e, pretty);
    }

    save_json(
        &output_dir.join(DETECTIONS_FILE),
        &outcome.collection,
        pretty,
    )?;

    let mut meta = RunMeta::new(outcome.status);
    meta.message = outcome.diagnostic.clone();
    meta.counts = outcome.counts;
    meta.fallback = outcome.fallback;
    meta.input_image = Some(input_image);
    save_json(&output_dir.join(META_FILE), &meta, pretty)?;

    Ok(RunReport {
        meta,
        outcome: Some(outcome),
        output_dir,
    })
}

pub fn load_inference_result(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| GeoError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| GeoError::json(path, e))
}

/// Replace any stale status record with an `error` one, then hand `err` back.
fn record_failure(
    output_dir: &Path,
    input_image: &str,
    err: GeoError,
    pretty: bool,
) -> Result<RunReport> {
    let mut meta = RunMeta::new(RunStatus::Error).with_message(err.to_string());
    meta.input_image = Some(input_image.to_string());
    save_json(&output_dir.join(META_FILE), &meta, pretty)?;
    Err(err)
}

fn write_artifacts(
    ctx: &RunContext,
    result: &Value,
    output_dir: &Path,
    input_image: &str,
    predictions_found: usize,
) -> Result<()> {
    let min_len = ctx.config.artifacts.base64_min_len;

    if ctx.config.artifacts.extract_annotated
        && let Some(image) = find_embedded_image(result, min_len)
    {
        match image.decode() {
            Some(bytes) => {
                let path = output_dir.join(format!("annotated.{}", image.format.extension()));
                std::fs::write(&path, bytes).map_err(|e| GeoError::io(&path, e))?;
                log::info!("wrote {}", path.display());
            }
            None => log::debug!("embedded image is not valid base64, skipping"),
        }
    }

    let summary = InferenceSummary::new(
        &strip_embedded_images(result, min_len),
        predictions_found,
        Some(input_image.to_string()),
    );
    save_json(
        &output_dir.join(SUMMARY_FILE),
        &summary,
        ctx.config.output.pretty,
    )
}

pub fn save_json<T: Serialize>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| GeoError::json(path, e))?;
    std::fs::write(path, text + "\n").map_err(|e| GeoError::io(path, e))
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
