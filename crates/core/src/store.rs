//! In-memory deck state and batched content updates.
//!
//! The deck is held as an immutable snapshot. A batch builds a new slide
//! vector and swaps it in, so snapshots handed out earlier never change.

use crate::error::Error;
use crate::types::{ContentPayload, Slide};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Partial content for one slide, addressed by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUpdate {
    /// Signed so that bad indices from callers can be reported, not wrapped.
    pub slide_index: i64,
    pub content: ContentPayload,
}

impl ContentUpdate {
    pub fn new(slide_index: i64, content: ContentPayload) -> Self {
        Self {
            slide_index,
            content,
        }
    }
}

/// Outcome of applying a batch to a slide collection.
#[derive(Debug)]
pub struct BatchOutcome {
    /// The new slide collection.
    pub slides: Vec<Slide>,
    /// Number of distinct slides that received an update.
    pub slides_updated: usize,
    /// One error per skipped update, in update order.
    pub errors: Vec<Error>,
}

/// Apply `updates` to `slides` without modifying the input.
///
/// Each in-range update is shallow-merged into its slide's content. Updates
/// with an out-of-range index are skipped and reported in `errors`.
pub fn apply_batch(slides: &[Slide], updates: &[ContentUpdate]) -> BatchOutcome {
    let mut next = slides.to_vec();
    let mut touched = BTreeSet::new();
    let mut errors = Vec::new();

    for update in updates {
        let index = usize::try_from(update.slide_index)
            .ok()
            .filter(|&i| i < next.len());

        match index {
            Some(i) => {
                next[i].content = next[i].content.merged_with(&update.content);
                touched.insert(i);
            }
            None => {
                log::warn!(
                    "Skipping content update for slide {} (deck has {} slides)",
                    update.slide_index,
                    next.len()
                );
                errors.push(Error::IndexOutOfRange {
                    index: update.slide_index,
                    len: next.len(),
                });
            }
        }
    }

    BatchOutcome {
        slides: next,
        slides_updated: touched.len(),
        errors,
    }
}

/// One line of the store's activity history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub message: String,
    pub slides_updated: usize,
    pub timestamp: DateTime<Utc>,
}

/// Owns the authoritative slide collection of a deck.
#[derive(Debug, Clone, Default)]
pub struct SlideContentStore {
    slides: Arc<Vec<Slide>>,
    activity: Vec<ActivityEntry>,
}

impl SlideContentStore {
    /// Create a store holding `slides`.
    pub fn new(slides: Vec<Slide>) -> Self {
        Self {
            slides: Arc::new(slides),
            activity: Vec::new(),
        }
    }

    /// Current slides.
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    /// A shared handle to the current collection. It is never mutated;
    /// later batches replace the store's handle instead.
    pub fn snapshot(&self) -> Arc<Vec<Slide>> {
        Arc::clone(&self.slides)
    }

    /// Activity history, oldest first.
    pub fn activity(&self) -> &[ActivityEntry] {
        &self.activity
    }

    /// Apply a batch of updates, swap in the resulting collection, and
    /// record a single activity entry. Returns the errors for skipped
    /// updates.
    pub fn apply_batch(&mut self, updates: &[ContentUpdate]) -> Vec<Error> {
        let outcome = apply_batch(&self.slides, updates);
        self.slides = Arc::new(outcome.slides);

        let message = format!(
            "Updated content on {} slide{}",
            outcome.slides_updated,
            if outcome.slides_updated == 1 { "" } else { "s" }
        );
        log::info!("{}", message);

        self.activity.push(ActivityEntry {
            message,
            slides_updated: outcome.slides_updated,
            timestamp: Utc::now(),
        });

        outcome.errors
    }
}
