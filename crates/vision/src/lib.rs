//! Remote layout analysis for slide images and the deck mapping pipeline
//! built on top of it.

pub mod client;
pub mod config;
pub mod pipeline;
pub mod retry;

#[cfg(test)]
mod testing;

pub use client::{extract_json_object, VisionAnalyzer, VisionClient};
pub use config::{RetryPolicy, VisionConfig};
pub use pipeline::{BatchFailureMode, MappingPipeline};
pub use retry::RetryCoordinator;
