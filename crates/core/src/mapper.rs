//! Pours slide content into text areas.
//!
//! Two strategies share one entry point. The exact-geometry strategy trusts
//! the areas it is given and reports overflow without touching the text.
//! The vision-fallback strategy works on areas inferred from a rendered
//! image and truncates text that does not fit.

use crate::types::{
    AreaMapping, AreaPosition, ContentPayload, ElementType, Formatting, TextAlign, TextArea,
    VisionElement, VisionResult,
};

/// Character budget used when an exact-geometry area declares none.
pub const DEFAULT_MAX_CHARS: usize = 500;

/// Slide extent in points used to size vision areas (16:9, 13.33in x 7.5in).
const SLIDE_WIDTH_PT: f64 = 960.0;
const SLIDE_HEIGHT_PT: f64 = 540.0;

const ELLIPSIS: &str = "...";

/// How content is fitted to areas for a whole deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingStrategy {
    /// Areas come from a geometry analyzer. Overflow is reported, not corrected.
    ExactGeometry,
    /// Areas were inferred by a vision model. Overflowing text is truncated.
    VisionFallback,
}

impl MappingStrategy {
    /// Map `content` onto every area, in area order.
    pub fn map_areas(self, content: &ContentPayload, areas: &[TextArea]) -> Vec<AreaMapping> {
        areas
            .iter()
            .map(|area| match self {
                MappingStrategy::ExactGeometry => map_exact_area(content, area),
                MappingStrategy::VisionFallback => map_vision_area(content, area),
            })
            .collect()
    }
}

fn map_exact_area(content: &ContentPayload, area: &TextArea) -> AreaMapping {
    let text = select_content(content, &area.area_type, "\n", "");
    let max_chars = area.max_chars.unwrap_or(DEFAULT_MAX_CHARS);
    AreaMapping::measured(area, text, max_chars)
}

fn map_vision_area(content: &ContentPayload, area: &TextArea) -> AreaMapping {
    let text = select_content(content, &area.area_type, "\n• ", "• ");
    let max_chars = area.max_chars.unwrap_or(DEFAULT_MAX_CHARS);
    AreaMapping::measured(area, truncate_with_ellipsis(&text, max_chars), max_chars)
}

/// Pick the text an area of `area_type` receives.
///
/// Bullets are joined with `separator`; `prefix` is prepended when there is
/// at least one bullet.
fn select_content(
    content: &ContentPayload,
    area_type: &str,
    separator: &str,
    prefix: &str,
) -> String {
    match area_type {
        "title" => content
            .title
            .as_ref()
            .or(content.heading.as_ref())
            .cloned()
            .unwrap_or_default(),
        "subtitle" => content.subtitle.clone().unwrap_or_default(),
        "bullets" => match content.bullets.as_deref() {
            Some(bullets) if !bullets.is_empty() => {
                format!("{}{}", prefix, bullets.join(separator))
            }
            _ => String::new(),
        },
        "body" => content
            .body
            .as_ref()
            .or(content.heading.as_ref())
            .cloned()
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Cut `text` to `max_chars` characters, ending in "..." when it was cut.
///
/// Budgets too small to hold the ellipsis keep a plain prefix instead.
fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= ELLIPSIS.len() {
        return text.chars().take(max_chars).collect();
    }
    let mut cut: String = text.chars().take(max_chars - ELLIPSIS.len()).collect();
    cut.push_str(ELLIPSIS);
    cut
}

/// Convert analyzed elements into text areas for the vision strategy.
///
/// Image and chart holders and unrecognized regions are not text areas
/// and are skipped.
pub fn vision_text_areas(result: &VisionResult) -> Vec<TextArea> {
    result
        .elements
        .iter()
        .filter_map(vision_element_to_area)
        .collect()
}

fn vision_element_to_area(element: &VisionElement) -> Option<TextArea> {
    let (area_type, size, bold, align) = match element.element_type {
        ElementType::Title => ("title", 44.0, true, TextAlign::Center),
        ElementType::Subtitle => ("subtitle", 20.0, false, TextAlign::Center),
        ElementType::Body => ("bullets", 18.0, false, TextAlign::Left),
        ElementType::Footer => ("footer", 12.0, false, TextAlign::Left),
        ElementType::ImageHolder | ElementType::ChartArea | ElementType::Unknown => return None,
    };

    let coords = element.coordinates;
    let position = AreaPosition {
        x: f64::from(coords.left) / 10.0,
        y: f64::from(coords.top) / 10.0,
        width: f64::from(coords.width) / 10.0,
        height: f64::from(coords.height) / 10.0,
    };

    Some(TextArea {
        id: element.id.clone(),
        area_type: area_type.to_string(),
        position,
        max_chars: Some(estimate_max_chars(&position, size)),
        formatting: Formatting {
            font: None,
            size: Some(size as f32),
            color: Some(element.style.color.clone()),
            bold,
            align: Some(align),
        },
    })
}

/// Estimate how many characters of `font_size` fit in a box.
///
/// Assumes an average glyph width of half the font size and a line height
/// of 1.2x. Both the line length and line count are at least 1.
fn estimate_max_chars(position: &AreaPosition, font_size: f64) -> usize {
    let width_pt = position.width / 100.0 * SLIDE_WIDTH_PT;
    let height_pt = position.height / 100.0 * SLIDE_HEIGHT_PT;

    let chars_per_line = (width_pt / (font_size * 0.5)).floor().max(1.0);
    let lines = (height_pt / (font_size * 1.2)).floor().max(1.0);

    (chars_per_line * lines) as usize
}

/// The single area used when no real layout is available.
pub fn default_title_area() -> TextArea {
    TextArea {
        id: "default_title".to_string(),
        area_type: "title".to_string(),
        position: AreaPosition {
            x: 10.0,
            y: 15.0,
            width: 80.0,
            height: 15.0,
        },
        max_chars: Some(100),
        formatting: Formatting {
            size: Some(44.0),
            bold: true,
            align: Some(TextAlign::Center),
            ..Default::default()
        },
    }
}

/// Map a slide onto [`default_title_area`] using only its title.
pub fn default_mapping(content: &ContentPayload) -> Vec<AreaMapping> {
    let area = default_title_area();
    let title = content.title.clone().unwrap_or_default();
    let max_chars = area.max_chars.unwrap_or(DEFAULT_MAX_CHARS);
    vec![AreaMapping::measured(&area, title, max_chars)]
}
