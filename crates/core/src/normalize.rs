//! Coordinate and field normalization for untrusted analysis output.
//!
//! Every function here is total: any input maps into the closed value
//! domain of the corresponding field, falling back to a fixed default.

use crate::types::{Coordinates, ElementType, TextAlign, SLIDE_AXIS_MAX};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Regex for #RGB, #RRGGBB and #RRGGBBAA colors.
static HEX_COLOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap());

const DEFAULT_COLOR: &str = "#000000";
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Round and clamp a raw number onto the 0..=1000 axis.
///
/// NaN and infinities map to 0.
pub fn clamp_coordinate(value: f64) -> u16 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, f64::from(SLIDE_AXIS_MAX)) as u16
}

/// Normalize a raw JSON value into a coordinate.
///
/// Anything that is not a JSON number (strings included) maps to 0.
pub fn normalize_coordinate(value: &Value) -> u16 {
    value.as_f64().map(clamp_coordinate).unwrap_or(0)
}

/// Normalize a raw `coordinates` object. Missing fields become 0.
pub fn normalize_coordinates(value: Option<&Value>) -> Coordinates {
    let field = |name: &str| {
        value
            .and_then(|v| v.get(name))
            .map(normalize_coordinate)
            .unwrap_or(0)
    };

    Coordinates {
        top: field("top"),
        left: field("left"),
        width: field("width"),
        height: field("height"),
    }
}

/// Resolve a raw `type` value to an element type.
///
/// Only strings whose trimmed, uppercased form is one of the six defined
/// names are accepted; everything else is `Unknown`.
pub fn validate_element_type(value: &Value) -> ElementType {
    value
        .as_str()
        .and_then(|s| ElementType::from_name(&s.trim().to_uppercase()))
        .unwrap_or(ElementType::Unknown)
}

/// Check a color string against the accepted hex forms.
pub fn is_hex_color(color: &str) -> bool {
    HEX_COLOR_REGEX.is_match(color)
}

/// Normalize a raw color, defaulting to black.
pub fn normalize_color(value: Option<&Value>) -> String {
    match value.and_then(Value::as_str) {
        Some(color) if is_hex_color(color) => color.to_string(),
        _ => DEFAULT_COLOR.to_string(),
    }
}

/// Normalize an optional color. Invalid colors are dropped.
pub fn normalize_optional_color(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|c| is_hex_color(c))
        .map(str::to_string)
}

/// Normalize a raw alignment. Only exact matches are accepted.
pub fn normalize_align(value: Option<&Value>) -> TextAlign {
    value
        .and_then(Value::as_str)
        .and_then(TextAlign::from_name)
        .unwrap_or_default()
}

/// Normalize a raw confidence into 0.0..=1.0, defaulting to 0.5.
pub fn normalize_confidence(value: Option<&Value>) -> f64 {
    match value.and_then(Value::as_f64) {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}
