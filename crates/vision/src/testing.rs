//! Scripted analyzers and a one-shot HTTP server for exercising the
//! client, retries and the pipeline without a real backend.

use crate::client::VisionAnalyzer;
use async_trait::async_trait;
use serde_json::{json, Value};
use slidemap_core::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// What the analyzer does on one call.
#[derive(Debug, Clone)]
pub enum Step {
    Respond(Value),
    Empty,
    Remote(u16),
    Malformed,
    /// A failure that is not worth retrying.
    Fatal,
}

impl Step {
    /// A response with a single title element.
    pub fn title() -> Self {
        Step::Respond(json!({
            "slide_metadata": { "aspect_ratio": "16:9" },
            "elements": [{
                "type": "TITLE",
                "coordinates": { "top": 50, "left": 100, "width": 800, "height": 100 },
                "style": { "color": "#2C3E50", "align": "center" },
                "confidence": 0.95
            }]
        }))
    }

    fn run(&self) -> Result<Value> {
        match self {
            Step::Respond(value) => Ok(value.clone()),
            Step::Empty => Ok(json!({ "elements": [] })),
            Step::Remote(status) => Err(Error::RemoteAnalysis {
                status: Some(*status),
                message: "scripted failure".to_string(),
            }),
            Step::Malformed => Err(Error::MalformedResponse("no JSON object".to_string())),
            Step::Fatal => Err(Error::Config("scripted fatal".to_string())),
        }
    }
}

enum Script {
    /// Steps consumed in call order, shared by every image.
    Sequence(Mutex<VecDeque<Step>>),
    /// The same step on every call for a given image.
    PerImage(HashMap<String, Step>),
}

pub struct ScriptedAnalyzer {
    script: Script,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedAnalyzer {
    pub fn sequence(steps: Vec<Step>) -> Self {
        Self {
            script: Script::Sequence(Mutex::new(steps.into())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn per_image<'a>(steps: impl IntoIterator<Item = (&'a str, Step)>) -> Self {
        Self {
            script: Script::PerImage(
                steps
                    .into_iter()
                    .map(|(image, step)| (image.to_string(), step))
                    .collect(),
            ),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, image: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(i, _)| i == image)
            .count()
    }
}

#[async_trait]
impl VisionAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, image: &str) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((image.to_string(), Instant::now()));

        let step = match &self.script {
            Script::Sequence(steps) => steps.lock().unwrap().pop_front(),
            Script::PerImage(steps) => steps.get(image).cloned(),
        };

        step.unwrap_or(Step::Remote(404)).run()
    }
}

/// One request captured by [`serve_once`].
#[derive(Debug)]
pub struct CapturedRequest {
    /// Request line and headers, lowercased.
    pub head: String,
    pub body: Value,
}

/// Serve a single HTTP response on a local port.
///
/// Returns the base URL to point a client at and a handle yielding the
/// request that was received.
pub async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/v1beta", listener.local_addr().unwrap());
    let body = body.to_string();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let (head_end, content_length) = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                let len = head
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim() == "content-length")
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                break (pos + 4, len);
            }
        };

        while buf.len() < head_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();

        CapturedRequest {
            head: String::from_utf8_lossy(&buf[..head_end]).to_lowercase(),
            body: serde_json::from_slice(&buf[head_end..head_end + content_length])
                .unwrap_or(Value::Null),
        }
    });

    (base_url, handle)
}
