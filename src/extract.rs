use crate::select::BBOX_KEYS;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys tried, in order, for a detection's confidence.
pub const CONFIDENCE_KEYS: &[&str] = &["confidence", "conf", "score", "probability"];

/// Keys tried, in order, for a detection's class label.
pub const CLASS_KEYS: &[&str] = &["class", "label", "name"];

const CENTER_PAIRS: &[(&str, &str)] = &[("x", "y"), ("center_x", "center_y")];
const CORNER_X_KEYS: &[&str] = &["x", "left", "x_min"];
const CORNER_Y_KEYS: &[&str] = &["y", "top", "y_min"];
const WIDTH_KEYS: &[&str] = &["width", "w"];
const HEIGHT_KEYS: &[&str] = &["height", "h"];

/// How a record's pixel position was resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Numeric `x`/`y` directly on the record.
    ExplicitXy { x: f64, y: f64 },
    /// A nested box giving its center.
    CenterBbox { x: f64, y: f64 },
    /// A nested box giving its top-left corner and size.
    CornerSizeBbox {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Unresolvable,
}

impl Resolution {
    pub fn center(&self) -> Option<(f64, f64)> {
        match *self {
            Resolution::ExplicitXy { x, y } | Resolution::CenterBbox { x, y } => Some((x, y)),
            Resolution::CornerSizeBbox {
                x,
                y,
                width,
                height,
            } => Some((x + width / 2.0, y + height / 2.0)),
            Resolution::Unresolvable => None,
        }
    }

    pub fn rule(&self) -> Option<ResolutionRule> {
        match self {
            Resolution::ExplicitXy { .. } => Some(ResolutionRule::ExplicitXy),
            Resolution::CenterBbox { .. } => Some(ResolutionRule::CenterBbox),
            Resolution::CornerSizeBbox { .. } => Some(ResolutionRule::CornerSizeBbox),
            Resolution::Unresolvable => None,
        }
    }
}

/// Name of the rule that produced a position, carried into feature properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionRule {
    ExplicitXy,
    CenterBbox,
    CornerSizeBbox,
}

/// A partial rule: either resolves a record or declines.
pub type Rule = fn(&Map<String, Value>) -> Option<Resolution>;

/// Rules in priority order. New upstream shapes get appended here.
pub const RULES: &[Rule] = &[explicit_xy, center_bbox, corner_size_bbox];

/// A detection normalized to a pixel center.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelDetection {
    pub x: f64,
    pub y: f64,
    pub confidence: Option<f64>,
    pub class: Option<String>,
    pub rule: ResolutionRule,
}

/// Result of extracting a whole candidate list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub detections: Vec<PixelDetection>,
    pub dropped: usize,
}

pub fn resolve(entry: &Map<String, Value>) -> Resolution {
    RULES
        .iter()
        .find_map(|rule| rule(entry))
        .unwrap_or(Resolution::Unresolvable)
}

pub fn extract(entry: &Map<String, Value>) -> Option<PixelDetection> {
    let resolution = resolve(entry);
    let (x, y) = resolution.center()?;
    let rule = resolution.rule()?;
    Some(PixelDetection {
        x,
        y,
        confidence: confidence(entry),
        class: class_label(entry),
        rule,
    })
}

/// Extract every resolvable entry; the rest are counted and skipped.
pub fn extract_all<'a, I>(entries: I) -> Extraction
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    let mut extraction = Extraction::default();
    for entry in entries {
        match extract(entry) {
            Some(detection) => extraction.detections.push(detection),
            None => extraction.dropped += 1,
        }
    }
    if extraction.dropped > 0 {
        log::debug!(
            "dropped {} unresolvable detection record(s)",
            extraction.dropped
        );
    }
    extraction
}

/// Confidence from the first present key; a non-numeric value means none.
pub fn confidence(entry: &Map<String, Value>) -> Option<f64> {
    first_present(entry, CONFIDENCE_KEYS)?.as_f64()
}

pub fn class_label(entry: &Map<String, Value>) -> Option<String> {
    match first_present(entry, CLASS_KEYS)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn explicit_xy(entry: &Map<String, Value>) -> Option<Resolution> {
    let (x, y) = numeric_pair(entry, "x", "y")?;
    Some(Resolution::ExplicitXy { x, y })
}

fn center_bbox(entry: &Map<String, Value>) -> Option<Resolution> {
    let bbox = nested_bbox(entry)?;
    CENTER_PAIRS
        .iter()
        .find_map(|(kx, ky)| numeric_pair(bbox, kx, ky))
        .map(|(x, y)| Resolution::CenterBbox { x, y })
}

fn corner_size_bbox(entry: &Map<String, Value>) -> Option<Resolution> {
    let bbox = nested_bbox(entry)?;
    Some(Resolution::CornerSizeBbox {
        x: first_number(bbox, CORNER_X_KEYS)?,
        y: first_number(bbox, CORNER_Y_KEYS)?,
        width: first_number(bbox, WIDTH_KEYS)?,
        height: first_number(bbox, HEIGHT_KEYS)?,
    })
}

fn nested_bbox(entry: &Map<String, Value>) -> Option<&Map<String, Value>> {
    BBOX_KEYS.iter().find_map(|key| entry.get(*key)?.as_object())
}

fn numeric_pair(map: &Map<String, Value>, kx: &str, ky: &str) -> Option<(f64, f64)> {
    Some((map.get(kx)?.as_f64()?, map.get(ky)?.as_f64()?))
}

fn first_number(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| map.get(*key)?.as_f64())
}

fn first_present<'m>(map: &'m Map<String, Value>, keys: &[&str]) -> Option<&'m Value> {
    keys.iter()
        .find_map(|key| map.get(*key).filter(|value| !value.is_null()))
}
