//! Side outputs derived from an inference result: the annotated image some
//! workflows embed as base64, and a compact summary safe to commit.

use crate::builder::top_level_object;
use serde::Serialize;
use serde_json::{Map, Value};

pub const BASE64_PLACEHOLDER: &str = "<base64_image_removed>";

const JPEG_BASE64_PREFIX: &str = "/9j/";
const PNG_BASE64_PREFIX: &str = "iVBORw0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }
}

/// An embedded image found inside the result.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage<'a> {
    pub format: ImageFormat,
    pub data: &'a str,
}

impl EmbeddedImage<'_> {
    pub fn decode(&self) -> Option<Vec<u8>> {
        base64::decode(self.data).ok()
    }
}

fn embedded_format(s: &str, min_len: usize) -> Option<ImageFormat> {
    if s.len() <= min_len {
        return None;
    }
    if s.starts_with(JPEG_BASE64_PREFIX) {
        Some(ImageFormat::Jpeg)
    } else if s.starts_with(PNG_BASE64_PREFIX) {
        Some(ImageFormat::Png)
    } else {
        None
    }
}

/// First long base64 JPEG/PNG string, in depth-first document order.
pub fn find_embedded_image(root: &Value, min_len: usize) -> Option<EmbeddedImage<'_>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match node {
            Value::String(s) => {
                let trimmed = s.trim();
                if let Some(format) = embedded_format(trimmed, min_len) {
                    return Some(EmbeddedImage {
                        format,
                        data: trimmed,
                    });
                }
            }
            Value::Array(items) => stack.extend(items.iter().rev()),
            Value::Object(map) => stack.extend(map.values().rev()),
            _ => {}
        }
    }
    None
}

/// Copy of `value` with embedded images replaced by a placeholder.
pub fn strip_embedded_images(value: &Value, min_len: usize) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), strip_embedded_images(v, min_len)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| strip_embedded_images(v, min_len))
                .collect(),
        ),
        Value::String(s) if embedded_format(s.trim(), min_len).is_some() => {
            Value::String(BASE64_PLACEHOLDER.to_string())
        }
        other => other.clone(),
    }
}

/// Field names of [`InferenceSummary`] that a numeric output may not shadow.
const SUMMARY_FIELDS: &[&str] = &["input_image", "predictions_found", "top_level_keys"];

/// Small record describing an inference result.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InferenceSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_image: Option<String>,
    pub predictions_found: usize,
    pub top_level_keys: Option<Vec<String>>,
    /// Every numeric top-level output, e.g. `Cattle_Group`.
    #[serde(flatten)]
    pub numeric_outputs: Map<String, Value>,
}

impl InferenceSummary {
    pub fn new(root: &Value, predictions_found: usize, input_image: Option<String>) -> Self {
        let top = top_level_object(root);
        let numeric_outputs = top
            .map(|map| {
                map.iter()
                    .filter(|(k, v)| v.is_number() && !SUMMARY_FIELDS.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            input_image,
            predictions_found,
            top_level_keys: top.map(|map| map.keys().cloned().collect()),
            numeric_outputs,
        }
    }
}
