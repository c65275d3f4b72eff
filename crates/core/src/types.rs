//! Domain types for slide layouts, analysis results, and mapped content.

use serde::{Deserialize, Serialize};

/// Upper bound of the normalized coordinate axis.
pub const SLIDE_AXIS_MAX: u16 = 1000;

// ============================================================================
// VISION ANALYSIS RESULT
// ============================================================================

/// Semantic role of a region detected on a rendered slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementType {
    Title,
    Subtitle,
    Body,
    Footer,
    ImageHolder,
    ChartArea,
    Unknown,
}

impl ElementType {
    /// The six roles a vision response may name. `Unknown` is not among them.
    pub const DEFINED: [ElementType; 6] = [
        ElementType::Title,
        ElementType::Subtitle,
        ElementType::Body,
        ElementType::Footer,
        ElementType::ImageHolder,
        ElementType::ChartArea,
    ];

    /// The wire name of this element type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Title => "TITLE",
            ElementType::Subtitle => "SUBTITLE",
            ElementType::Body => "BODY",
            ElementType::Footer => "FOOTER",
            ElementType::ImageHolder => "IMAGE_HOLDER",
            ElementType::ChartArea => "CHART_AREA",
            ElementType::Unknown => "UNKNOWN",
        }
    }

    /// Look up a defined element type by its exact wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::DEFINED.into_iter().find(|t| t.as_str() == name)
    }
}

/// Box position on the normalized 0..=1000 axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub top: u16,
    pub left: u16,
    pub width: u16,
    pub height: u16,
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// Match one of the allowed alignment names exactly.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Visual style observed for an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementStyle {
    /// Hex color, always valid after parsing.
    pub color: String,
    pub align: TextAlign,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            color: "#000000".to_string(),
            align: TextAlign::Left,
            background_color: None,
        }
    }
}

/// A single region detected on a slide image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionElement {
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub coordinates: Coordinates,
    pub style: ElementStyle,
    /// Always within 0.0..=1.0.
    pub confidence: f64,
    /// Template shape this element was matched to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideMetadata {
    pub aspect_ratio: String,
}

impl Default for SlideMetadata {
    fn default() -> Self {
        Self {
            aspect_ratio: "16:9".to_string(),
        }
    }
}

/// Fully normalized result of analyzing one slide image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionResult {
    pub slide_metadata: SlideMetadata,
    pub elements: Vec<VisionElement>,
}

// ============================================================================
// TEXT AREAS AND CONTENT
// ============================================================================

/// Area position as percentages (0-100) of the slide extent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaPosition {
    #[serde(alias = "x_percent")]
    pub x: f64,
    #[serde(alias = "y_percent")]
    pub y: f64,
    #[serde(alias = "width_percent")]
    pub width: f64,
    #[serde(alias = "height_percent")]
    pub height: f64,
}

/// Font settings carried by a text area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Formatting {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
}

/// A rectangular region of a slide with a content role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextArea {
    pub id: String,
    /// Content role: "title", "subtitle", "bullets", "body", ...
    #[serde(rename = "type")]
    pub area_type: String,
    pub position: AreaPosition,
    /// Character budget. `None` means the source declared no limit.
    #[serde(default, alias = "max_chars", skip_serializing_if = "Option::is_none")]
    pub max_chars: Option<usize>,
    #[serde(default)]
    pub formatting: Formatting,
}

/// Generated text for one slide. Also used as a partial update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bullets: Option<Vec<String>>,
}

impl ContentPayload {
    /// Shallow merge: fields set in `patch` win, the rest are kept.
    pub fn merged_with(&self, patch: &ContentPayload) -> ContentPayload {
        ContentPayload {
            title: patch.title.clone().or_else(|| self.title.clone()),
            subtitle: patch.subtitle.clone().or_else(|| self.subtitle.clone()),
            heading: patch.heading.clone().or_else(|| self.heading.clone()),
            body: patch.body.clone().or_else(|| self.body.clone()),
            bullets: patch.bullets.clone().or_else(|| self.bullets.clone()),
        }
    }
}

// ============================================================================
// MAPPING OUTPUT
// ============================================================================

/// Content poured into one text area, with fit accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaMapping {
    pub area_id: String,
    pub area_type: String,
    pub content: String,
    pub position: AreaPosition,
    pub formatting: Formatting,
    pub max_chars: usize,
    pub fits_in_area: bool,
    pub overflow: usize,
}

impl AreaMapping {
    /// Build a mapping for `area`, deriving `overflow` and `fits_in_area`
    /// from the content length in characters.
    pub fn measured(area: &TextArea, content: String, max_chars: usize) -> Self {
        let overflow = content.chars().count().saturating_sub(max_chars);
        Self {
            area_id: area.id.clone(),
            area_type: area.area_type.clone(),
            content,
            position: area.position,
            formatting: area.formatting.clone(),
            max_chars,
            fits_in_area: overflow == 0,
            overflow,
        }
    }
}

/// Mapping for a whole slide, index-aligned with its deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideMapping {
    pub slide_index: usize,
    pub slide_type: String,
    pub areas: Vec<AreaMapping>,
    pub preview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_areas: Option<Vec<TextArea>>,
}

// ============================================================================
// DECK
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideLayout {
    #[serde(default)]
    pub text_areas: Vec<TextArea>,
}

/// A slide as held by the editing application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub id: String,
    #[serde(rename = "type")]
    pub slide_type: String,
    #[serde(default)]
    pub content: ContentPayload,
    /// Rendered image of the slide, base64 or a data URL.
    #[serde(default)]
    pub preview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<SlideLayout>,
}

impl Slide {
    /// Create a slide with empty content and no layout.
    pub fn new(id: impl Into<String>, slide_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slide_type: slide_type.into(),
            content: ContentPayload::default(),
            preview: String::new(),
            layout: None,
        }
    }

    /// Exact-geometry text areas, empty when the slide has none.
    pub fn text_areas(&self) -> &[TextArea] {
        self.layout
            .as_ref()
            .map(|l| l.text_areas.as_slice())
            .unwrap_or(&[])
    }
}
