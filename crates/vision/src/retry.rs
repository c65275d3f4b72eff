//! Bounded retries around a [`VisionAnalyzer`], with linear backoff and a
//! quality gate on empty results.

use crate::client::VisionAnalyzer;
use crate::config::RetryPolicy;
use slidemap_core::{parse_vision_response, Error, Result, VisionResult};

/// Runs analyses under a [`RetryPolicy`].
pub struct RetryCoordinator<A> {
    analyzer: A,
    policy: RetryPolicy,
}

impl<A: VisionAnalyzer> RetryCoordinator<A> {
    pub fn new(analyzer: A, policy: RetryPolicy) -> Self {
        Self { analyzer, policy }
    }

    #[cfg(test)]
    pub(crate) fn analyzer(&self) -> &A {
        &self.analyzer
    }

    /// Analyze one slide image.
    ///
    /// Returns the first result that has at least one element. A result with
    /// no elements is retried like a failure, except on the final attempt,
    /// where it is returned as is. When every attempt fails the last error is
    /// wrapped in [`Error::RetriesExhausted`].
    pub async fn analyze(&self, image: &str) -> Result<VisionResult> {
        let total = self.policy.total_attempts();
        let mut attempts_made = 0;
        let mut last_error = None;

        for attempt in 0..total {
            let is_final = attempt + 1 == total;

            if attempt > 0 {
                let delay = self.policy.backoff(attempt);
                log::info!(
                    "Retrying layout analysis in {}ms (attempt {}/{})",
                    delay.as_millis(),
                    attempt + 1,
                    total
                );
                tokio::time::sleep(delay).await;
            }

            attempts_made += 1;
            match self.attempt(image).await {
                Ok(result) if result.elements.is_empty() && !is_final => {
                    log::warn!(
                        "Layout analysis attempt {}/{} found no elements",
                        attempt + 1,
                        total
                    );
                    last_error = Some(Error::EmptyResult);
                }
                Ok(result) => {
                    log::debug!(
                        "Layout analysis found {} elements on attempt {}",
                        result.elements.len(),
                        attempt + 1
                    );
                    return Ok(result);
                }
                Err(e) if e.is_retryable() => {
                    log::warn!(
                        "Layout analysis attempt {}/{} failed: {}",
                        attempt + 1,
                        total,
                        e
                    );
                    last_error = Some(e);
                }
                Err(e) => {
                    log::warn!("Layout analysis failed and will not be retried: {}", e);
                    last_error = Some(e);
                    break;
                }
            }
        }

        Err(Error::RetriesExhausted {
            attempts: attempts_made,
            message: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    async fn attempt(&self, image: &str) -> Result<VisionResult> {
        let raw = self.analyzer.analyze(image).await?;
        Ok(parse_vision_response(&raw))
    }
}
