//! Turns raw vision-analysis JSON into a total, typed [`VisionResult`].
//!
//! This is the only place untrusted structure crosses into the typed model.
//! Parsing never fails: every missing or malformed field is replaced by a
//! default from its closed value domain.

use crate::normalize::{
    normalize_align, normalize_color, normalize_confidence, normalize_coordinates,
    normalize_optional_color, validate_element_type,
};
use crate::types::{ElementStyle, ElementType, SlideMetadata, VisionElement, VisionResult};
use serde_json::Value;

/// Parse an arbitrary JSON value into a [`VisionResult`].
pub fn parse_vision_response(raw: &Value) -> VisionResult {
    let slide_metadata = raw
        .get("slide_metadata")
        .and_then(|m| m.get("aspect_ratio"))
        .and_then(Value::as_str)
        .map(|ratio| SlideMetadata {
            aspect_ratio: ratio.to_string(),
        })
        .unwrap_or_default();

    let elements = match raw.get("elements") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| parse_element(item, idx))
            .collect(),
        _ => Vec::new(),
    };

    VisionResult {
        slide_metadata,
        elements,
    }
}

/// Parse one raw element. `index` is its 0-based position in the response.
fn parse_element(raw: &Value, index: usize) -> VisionElement {
    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("element_{}", index + 1));

    let element_type = raw
        .get("type")
        .map(validate_element_type)
        .unwrap_or(ElementType::Unknown);

    let style = raw.get("style");
    let style = ElementStyle {
        color: normalize_color(style.and_then(|s| s.get("color"))),
        align: normalize_align(style.and_then(|s| s.get("align"))),
        background_color: normalize_optional_color(
            style.and_then(|s| s.get("backgroundColor")),
        ),
    };

    VisionElement {
        id,
        element_type,
        coordinates: normalize_coordinates(raw.get("coordinates")),
        style,
        confidence: normalize_confidence(raw.get("confidence")),
        shape_id: raw
            .get("shapeId")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}
