//! Deck-level orchestration: picks a geometry source, runs per-slide
//! analyses concurrently, and always returns one mapping per slide.

use crate::client::{VisionAnalyzer, VisionClient};
use crate::config::VisionConfig;
use crate::retry::RetryCoordinator;
use futures::future::{join_all, try_join_all};
use slidemap_core::{
    default_mapping, vision_text_areas, ContentPayload, Error, MappingStrategy, Result, Slide,
    SlideMapping, VisionResult,
};

/// How a failed slide analysis affects the rest of the deck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchFailureMode {
    /// Any failed slide sends the whole deck to the default mapping.
    #[default]
    AllOrNothing,
    /// Only the failed slide falls back to the default mapping.
    PerSlide,
}

pub struct MappingPipeline<A> {
    retry: RetryCoordinator<A>,
    failure_mode: BatchFailureMode,
}

impl MappingPipeline<VisionClient> {
    /// Build a pipeline backed by the remote vision client.
    pub fn from_config(config: &VisionConfig) -> Result<Self> {
        let client = VisionClient::new(config)?;
        Ok(Self::new(RetryCoordinator::new(client, config.retry)))
    }
}

impl<A: VisionAnalyzer> MappingPipeline<A> {
    pub fn new(retry: RetryCoordinator<A>) -> Self {
        Self {
            retry,
            failure_mode: BatchFailureMode::default(),
        }
    }

    pub fn with_failure_mode(mut self, mode: BatchFailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// Map generated content onto every slide of a deck.
    ///
    /// `generated[i]` is the content for `slides[i]`; slides without
    /// generated content use their own. If any slide carries exact text
    /// areas, exact geometry is used for the whole deck. Otherwise each
    /// slide image is analyzed. The result is index-aligned with `slides`
    /// and never an error.
    pub async fn map_deck(
        &self,
        slides: &[Slide],
        generated: &[ContentPayload],
    ) -> Vec<SlideMapping> {
        if slides.iter().any(|s| !s.text_areas().is_empty()) {
            log::info!("Mapping {} slides with exact geometry", slides.len());
            return slides
                .iter()
                .enumerate()
                .map(|(i, slide)| exact_mapping(i, slide, content_for(i, slide, generated)))
                .collect();
        }

        log::info!(
            "No exact geometry in deck, analyzing {} slide images",
            slides.len()
        );
        self.map_with_vision(slides, generated).await
    }

    async fn map_with_vision(
        &self,
        slides: &[Slide],
        generated: &[ContentPayload],
    ) -> Vec<SlideMapping> {
        let analyses = slides
            .iter()
            .enumerate()
            .map(|(i, slide)| self.analyze_slide(i, slide));

        match self.failure_mode {
            BatchFailureMode::AllOrNothing => match try_join_all(analyses).await {
                Ok(results) => slides
                    .iter()
                    .zip(&results)
                    .enumerate()
                    .map(|(i, (slide, result))| {
                        vision_mapping(i, slide, content_for(i, slide, generated), result)
                    })
                    .collect(),
                Err(e) => {
                    log::warn!(
                        "Deck analysis failed, using default layout for all slides: {}",
                        e
                    );
                    slides
                        .iter()
                        .enumerate()
                        .map(|(i, slide)| {
                            fallback_mapping(i, slide, content_for(i, slide, generated))
                        })
                        .collect()
                }
            },
            BatchFailureMode::PerSlide => join_all(analyses)
                .await
                .into_iter()
                .zip(slides)
                .enumerate()
                .map(|(i, (result, slide))| {
                    let content = content_for(i, slide, generated);
                    match result {
                        Ok(result) => vision_mapping(i, slide, content, &result),
                        Err(_) => fallback_mapping(i, slide, content),
                    }
                })
                .collect(),
        }
    }

    async fn analyze_slide(&self, index: usize, slide: &Slide) -> Result<VisionResult> {
        if slide.preview.trim().is_empty() {
            log::warn!("Slide {} has no preview image to analyze", index);
            return Err(Error::MissingImage(index));
        }

        self.retry.analyze(&slide.preview).await.map_err(|e| {
            log::warn!("Analysis of slide {} failed: {}", index, e);
            e
        })
    }
}

fn content_for<'a>(
    index: usize,
    slide: &'a Slide,
    generated: &'a [ContentPayload],
) -> &'a ContentPayload {
    generated.get(index).unwrap_or(&slide.content)
}

/// Map onto the slide's own text areas. A slide without any, in a deck
/// that has them elsewhere, gets the default layout.
fn exact_mapping(index: usize, slide: &Slide, content: &ContentPayload) -> SlideMapping {
    let areas = slide.text_areas();
    if areas.is_empty() {
        log::debug!("Slide {} has no text areas in an exact-geometry deck", index);
        return fallback_mapping(index, slide, content);
    }

    SlideMapping {
        slide_index: index,
        slide_type: slide.slide_type.clone(),
        areas: MappingStrategy::ExactGeometry.map_areas(content, areas),
        preview: slide.preview.clone(),
        text_areas: Some(areas.to_vec()),
    }
}

/// Map onto analyzed areas. A result without any text area gets the
/// default layout so the slide stays renderable.
fn vision_mapping(
    index: usize,
    slide: &Slide,
    content: &ContentPayload,
    result: &VisionResult,
) -> SlideMapping {
    let areas = vision_text_areas(result);
    if areas.is_empty() {
        log::debug!("Slide {} analysis found no text areas", index);
        return fallback_mapping(index, slide, content);
    }

    SlideMapping {
        slide_index: index,
        slide_type: slide.slide_type.clone(),
        areas: MappingStrategy::VisionFallback.map_areas(content, &areas),
        preview: slide.preview.clone(),
        text_areas: Some(areas),
    }
}

fn fallback_mapping(index: usize, slide: &Slide, content: &ContentPayload) -> SlideMapping {
    SlideMapping {
        slide_index: index,
        slide_type: slide.slide_type.clone(),
        areas: default_mapping(content),
        preview: slide.preview.clone(),
        text_areas: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::testing::{ScriptedAnalyzer, Step};
    use serde_json::json;
    use slidemap_core::{AreaPosition, Formatting, SlideLayout, TextArea};

    fn pipeline(analyzer: ScriptedAnalyzer) -> MappingPipeline<ScriptedAnalyzer> {
        MappingPipeline::new(RetryCoordinator::new(analyzer, RetryPolicy::default()))
    }

    fn image_slide(i: usize) -> Slide {
        let mut slide = Slide::new(format!("slide-{}", i), "content");
        slide.preview = format!("data:image/png;base64,SLIDE{}", i);
        slide
    }

    fn deck(n: usize) -> Vec<Slide> {
        (0..n).map(image_slide).collect()
    }

    fn titles(n: usize) -> Vec<ContentPayload> {
        (0..n)
            .map(|i| ContentPayload {
                title: Some(format!("Generated {}", i)),
                bullets: Some(vec!["Alpha".to_string(), "Beta".to_string()]),
                ..Default::default()
            })
            .collect()
    }

    fn title_area() -> TextArea {
        TextArea {
            id: "ta_title".to_string(),
            area_type: "title".to_string(),
            position: AreaPosition { x: 5.0, y: 5.0, width: 90.0, height: 15.0 },
            max_chars: Some(10),
            formatting: Formatting::default(),
        }
    }

    fn is_default(mapping: &SlideMapping) -> bool {
        mapping.areas.len() == 1 && mapping.areas[0].area_id == "default_title"
    }

    #[tokio::test(start_paused = true)]
    async fn test_exact_geometry_used_for_whole_deck() {
        let mut slides = deck(2);
        slides[0].layout = Some(SlideLayout {
            text_areas: vec![title_area()],
        });

        let pipeline = pipeline(ScriptedAnalyzer::per_image([]));
        let mappings = pipeline.map_deck(&slides, &titles(2)).await;

        assert_eq!(pipeline.retry.analyzer().call_count(), 0);
        assert_eq!(mappings.len(), 2);

        let first = &mappings[0];
        assert_eq!(first.areas[0].content, "Generated 0");
        assert_eq!(first.areas[0].overflow, 1);
        assert!(!first.areas[0].fits_in_area);
        assert_eq!(first.text_areas.as_ref().map(Vec::len), Some(1));

        assert!(is_default(&mappings[1]));
        assert_eq!(mappings[1].slide_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exact_deck_slide_without_areas_keeps_its_title() {
        let mut slides = deck(2);
        slides[0].layout = Some(SlideLayout {
            text_areas: vec![title_area()],
        });
        slides[1].content.title = Some("Closing thoughts".to_string());

        let pipeline = pipeline(ScriptedAnalyzer::per_image([]));
        let mappings = pipeline.map_deck(&slides, &titles(1)).await;

        assert_eq!(pipeline.retry.analyzer().call_count(), 0);
        assert_eq!(mappings[0].text_areas.as_ref().map(Vec::len), Some(1));

        let second = &mappings[1];
        assert!(is_default(second));
        assert_eq!(second.areas[0].content, "Closing thoughts");
        assert!(second.areas[0].fits_in_area);
        assert!(second.text_areas.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_vision_mapping_per_slide() {
        let slides = deck(3);
        let analyzer = ScriptedAnalyzer::per_image(
            slides.iter().map(|s| (s.preview.as_str(), Step::title())),
        );

        let mappings = pipeline(analyzer).map_deck(&slides, &titles(3)).await;

        assert_eq!(mappings.len(), 3);
        for (i, mapping) in mappings.iter().enumerate() {
            assert_eq!(mapping.slide_index, i);
            assert_eq!(mapping.preview, slides[i].preview);
            assert_eq!(mapping.areas.len(), 1);
            assert_eq!(mapping.areas[0].area_type, "title");
            assert_eq!(mapping.areas[0].content, format!("Generated {}", i));
            assert!(!is_default(mapping));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_failing_slide_degrades_whole_deck() {
        let slides = deck(3);
        let analyzer = ScriptedAnalyzer::per_image([
            (slides[0].preview.as_str(), Step::title()),
            (slides[1].preview.as_str(), Step::Remote(500)),
            (slides[2].preview.as_str(), Step::title()),
        ]);

        let pipeline = pipeline(analyzer);
        let mappings = pipeline.map_deck(&slides, &titles(3)).await;

        assert_eq!(mappings.len(), 3);
        assert!(mappings.iter().all(is_default));
        assert_eq!(mappings[2].areas[0].content, "Generated 2");
        assert_eq!(mappings[2].areas[0].max_chars, 100);
        assert_eq!(pipeline.retry.analyzer().calls_for(&slides[1].preview), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_slide_mode_keeps_successful_slides() {
        let slides = deck(3);
        let analyzer = ScriptedAnalyzer::per_image([
            (slides[0].preview.as_str(), Step::Malformed),
            (slides[1].preview.as_str(), Step::title()),
            (slides[2].preview.as_str(), Step::title()),
        ]);

        let mappings = pipeline(analyzer)
            .with_failure_mode(BatchFailureMode::PerSlide)
            .map_deck(&slides, &titles(3))
            .await;

        assert!(is_default(&mappings[0]));
        assert_eq!(mappings[0].slide_index, 0);
        assert!(!is_default(&mappings[1]));
        assert!(!is_default(&mappings[2]));
        assert_eq!(mappings[2].areas[0].content, "Generated 2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_preview_fails_the_slide() {
        let mut slides = deck(2);
        slides[1].preview.clear();
        let analyzer = ScriptedAnalyzer::per_image([(slides[0].preview.as_str(), Step::title())]);

        let pipeline = pipeline(analyzer);
        let mappings = pipeline.map_deck(&slides, &titles(2)).await;

        assert!(mappings.iter().all(is_default));
        assert_eq!(pipeline.retry.analyzer().calls_for(""), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_without_text_areas_gets_default() {
        let slides = deck(1);
        let analyzer = ScriptedAnalyzer::per_image([(
            slides[0].preview.as_str(),
            Step::Respond(json!({
                "elements": [{ "type": "IMAGE_HOLDER", "coordinates": { "width": 500, "height": 500 } }]
            })),
        )]);

        let mappings = pipeline(analyzer).map_deck(&slides, &titles(1)).await;
        assert!(is_default(&mappings[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_generated_content_uses_slide_content() {
        let mut slides = deck(2);
        slides[1].content.title = Some("Own title".to_string());
        let analyzer = ScriptedAnalyzer::per_image(
            slides.iter().map(|s| (s.preview.as_str(), Step::title())),
        );

        let mappings = pipeline(analyzer).map_deck(&slides, &titles(1)).await;
        assert_eq!(mappings[0].areas[0].content, "Generated 0");
        assert_eq!(mappings[1].areas[0].content, "Own title");
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_deck() {
        let mappings = pipeline(ScriptedAnalyzer::per_image([])).map_deck(&[], &[]).await;
        assert!(mappings.is_empty());
    }
}
