//! Remote layout analysis of slide images.

use crate::config::VisionConfig;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use slidemap_core::{Error, Result};
use std::sync::LazyLock;
use std::time::Duration;

/// Matches a data URL header such as `data:image/jpeg;base64,`.
static DATA_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^data:([\w.+-]+/[\w.+-]+)?(?:;[^,]*)?,").unwrap());

const DEFAULT_MIME_TYPE: &str = "image/png";

/// Instruction sent with every slide image.
pub const ANALYSIS_PROMPT: &str = r##"You are a presentation layout analyst. Analyze the slide image and identify every distinct region a presenter would place content into.

Respond with ONLY a JSON object of this exact shape, with no prose and no code fences:
{
  "slide_metadata": { "aspect_ratio": "16:9" },
  "elements": [
    {
      "id": "element_1",
      "type": "TITLE",
      "coordinates": { "top": 50, "left": 100, "width": 800, "height": 100 },
      "style": { "color": "#2C3E50", "align": "center" },
      "confidence": 0.95
    }
  ]
}

Rules:
- "type" is one of TITLE, SUBTITLE, BODY, FOOTER, IMAGE_HOLDER, CHART_AREA.
- Coordinates are integers on a 0-1000 scale relative to the slide width (left, width) and height (top, height).
- "color" is the hex color of the text in that region; "align" is left, center or right.
- "confidence" is a number between 0 and 1.
- Number elements sequentially: element_1, element_2, ..."##;

/// One remote layout analysis of a slide image.
///
/// Implementations return the raw JSON object found in the backend's
/// answer; interpreting it is left to the caller.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    async fn analyze(&self, image: &str) -> Result<Value>;
}

/// Base64 image data with its MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePayload<'a> {
    pub mime_type: &'a str,
    pub data: &'a str,
}

/// Strip an optional data URL header from a base64 image.
pub fn split_data_url(image: &str) -> ImagePayload<'_> {
    let image = image.trim();
    match DATA_URL_REGEX.captures(image) {
        Some(caps) => {
            let header_len = caps.get(0).map(|m| m.end()).unwrap_or(0);
            ImagePayload {
                mime_type: caps.get(1).map(|m| m.as_str()).unwrap_or(DEFAULT_MIME_TYPE),
                data: &image[header_len..],
            }
        }
        None => ImagePayload {
            mime_type: DEFAULT_MIME_TYPE,
            data: image,
        },
    }
}

/// Find the first brace-balanced JSON object embedded in free text.
///
/// Candidates that balance but fail to parse are skipped.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let mut spans = balanced_object_spans(text);
    spans.sort_unstable_by_key(|&(start, _)| start);

    spans
        .into_iter()
        .find_map(|(start, end)| match serde_json::from_str::<Value>(&text[start..end]) {
            Ok(value @ Value::Object(_)) => Some(value),
            _ => None,
        })
}

/// Byte ranges of every brace-balanced object, found in a single pass.
///
/// String literals are only tracked inside an open brace, so quotes in the
/// surrounding prose do not hide objects. Unmatched braces never close a span.
fn balanced_object_spans(text: &str) -> Vec<(usize, usize)> {
    let mut open = Vec::new();
    let mut spans = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' if !open.is_empty() => in_string = true,
            '{' => open.push(offset),
            '}' => {
                if let Some(start) = open.pop() {
                    spans.push((start, offset + 1));
                }
            }
            _ => {}
        }
    }

    spans
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Pull the backend's error message out of a failure body.
fn remote_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| body.trim().to_string())
}

// ============================================================================
// CLIENT
// ============================================================================

/// Client for a Generative Language style `generateContent` endpoint.
pub struct VisionClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl VisionClient {
    /// Create a client from configuration. Fails without an API key.
    pub fn new(config: &VisionConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn build_request<'a>(&self, image: ImagePayload<'a>) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text {
                        text: ANALYSIS_PROMPT,
                    },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type,
                            data: image.data,
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: "application/json",
            },
        }
    }

    /// Send one slide image for analysis and return the JSON object found
    /// in the answer.
    pub async fn analyze_image(&self, image: &str) -> Result<Value> {
        let payload = split_data_url(image);
        let request = self.build_request(payload);
        log::debug!(
            "Requesting layout analysis from {} ({} bytes of {})",
            self.model,
            payload.data.len(),
            payload.mime_type
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::RemoteAnalysis {
                status: e.status().map(|s| s.as_u16()),
                message: format!("Request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::RemoteAnalysis {
                status: Some(status.as_u16()),
                message: remote_error_message(&body),
            });
        }

        let completion: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("Failed to parse response: {}", e)))?;

        let text = completion
            .text()
            .ok_or_else(|| Error::MalformedResponse("No response content".to_string()))?;

        extract_json_object(&text).ok_or_else(|| {
            let preview: String = text.chars().take(200).collect();
            Error::MalformedResponse(format!("No JSON object found in response: {}", preview))
        })
    }
}

#[async_trait]
impl VisionAnalyzer for VisionClient {
    async fn analyze(&self, image: &str) -> Result<Value> {
        self.analyze_image(image).await
    }
}
