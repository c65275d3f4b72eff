//! Error types for slide layout analysis and content mapping.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while analyzing layouts or updating slide content.
#[derive(Error, Debug)]
pub enum Error {
    /// The vision backend could not be reached or answered with a failure status.
    #[error("Remote analysis failed{}: {message}", status_suffix(.status))]
    RemoteAnalysis {
        status: Option<u16>,
        message: String,
    },

    /// The backend answered, but no JSON object could be found in its text.
    #[error("Malformed analysis response: {0}")]
    MalformedResponse(String),

    /// The analysis parsed cleanly but contained no elements.
    #[error("Analysis returned no layout elements")]
    EmptyResult,

    /// Every attempt at analyzing a slide failed.
    #[error("Analysis failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// A batch update addressed a slide that does not exist.
    #[error("Slide index {index} out of range (deck has {len} slides)")]
    IndexOutOfRange { index: i64, len: usize },

    /// The slide has no preview image to analyze.
    #[error("Slide {0} has no preview image")]
    MissingImage(usize),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to read an input file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode or encode JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

impl Error {
    /// Whether another analysis attempt may succeed after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RemoteAnalysis { .. } | Error::MalformedResponse(_) | Error::EmptyResult
        )
    }
}
