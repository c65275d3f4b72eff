//! CLI tool for analyzing slide layouts and mapping generated content onto them.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use slidemap_core::{
    parse_vision_response, ContentPayload, ContentUpdate, Slide, SlideContentStore,
};
use slidemap_vision::{
    extract_json_object, BatchFailureMode, MappingPipeline, RetryCoordinator, VisionAnalyzer,
    VisionClient, VisionConfig,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Map generated slide content onto template layouts.
#[derive(Parser, Debug)]
#[command(name = "slidemap")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// JSON config file for the vision backend (default: environment only)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize a raw layout analysis response (JSON or model text)
    Parse {
        /// File holding the raw response
        file: PathBuf,
    },

    /// Analyze one slide image with the vision backend
    Analyze {
        /// Slide image (.png, .jpg, .webp, .gif)
        image: PathBuf,
    },

    /// Map content onto every slide of a deck
    Map {
        /// Deck JSON: an array of slides
        #[arg(short, long)]
        deck: PathBuf,

        /// Generated content JSON: an array of payloads, one per slide
        #[arg(long)]
        content: Option<PathBuf>,

        /// Fall back per slide instead of for the whole deck
        #[arg(long)]
        per_slide: bool,
    },

    /// Apply a batch of content updates to a deck
    Apply {
        /// Deck JSON: an array of slides
        #[arg(short, long)]
        deck: PathBuf,

        /// Updates JSON: an array of {"slideIndex", "content"} objects
        #[arg(short, long)]
        updates: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match &args.command {
        Command::Parse { file } => parse(file),
        Command::Analyze { image } => analyze(&load_config(&args)?, image).await,
        Command::Map {
            deck,
            content,
            per_slide,
        } => {
            let mode = if *per_slide {
                BatchFailureMode::PerSlide
            } else {
                BatchFailureMode::AllOrNothing
            };
            map(&load_config(&args)?, deck, content.as_deref(), mode).await
        }
        Command::Apply { deck, updates } => apply(deck, updates),
    }
}

fn load_config(args: &Args) -> Result<VisionConfig> {
    let config = match &args.config {
        Some(path) => VisionConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => VisionConfig::default(),
    };
    Ok(config.with_env_overrides())
}

fn parse(file: &Path) -> Result<()> {
    let text = read_text(file)?;
    let raw = match serde_json::from_str::<Value>(&text) {
        Ok(value) => value,
        Err(_) => extract_json_object(&text)
            .with_context(|| format!("No JSON object found in {}", file.display()))?,
    };

    print_json(&parse_vision_response(&raw))
}

async fn analyze(config: &VisionConfig, image: &Path) -> Result<()> {
    let data_url = image_data_url(image)?;
    let client = VisionClient::new(config)?;
    let retry = RetryCoordinator::new(client, config.retry);

    let result = retry.analyze(&data_url).await?;
    log::info!("Found {} elements in {}", result.elements.len(), image.display());
    print_json(&result)
}

async fn map(
    config: &VisionConfig,
    deck: &Path,
    content: Option<&Path>,
    mode: BatchFailureMode,
) -> Result<()> {
    let mut slides: Vec<Slide> = read_json(deck)?;
    let generated: Vec<ContentPayload> = match content {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let base_dir = deck.parent().unwrap_or_else(|| Path::new("."));
    for slide in &mut slides {
        slide.preview = resolve_preview(base_dir, &slide.preview)?;
    }

    let mappings = match VisionClient::new(config) {
        Ok(client) => {
            let pipeline = MappingPipeline::new(RetryCoordinator::new(client, config.retry))
                .with_failure_mode(mode);
            pipeline.map_deck(&slides, &generated).await
        }
        Err(e) => {
            log::warn!("Vision backend unavailable: {}", e);
            let pipeline = MappingPipeline::new(RetryCoordinator::new(Unconfigured, config.retry))
                .with_failure_mode(mode);
            pipeline.map_deck(&slides, &generated).await
        }
    };

    print_json(&mappings)
}

fn apply(deck: &Path, updates: &Path) -> Result<()> {
    let slides: Vec<Slide> = read_json(deck)?;
    let updates: Vec<ContentUpdate> = read_json(updates)?;

    let mut store = SlideContentStore::new(slides);
    let errors = store.apply_batch(&updates);
    for error in &errors {
        eprintln!("Skipped update: {}", error);
    }

    #[derive(Serialize)]
    struct Output<'a> {
        slides: &'a [Slide],
        activity: &'a [slidemap_core::ActivityEntry],
    }

    print_json(&Output {
        slides: store.slides(),
        activity: store.activity(),
    })
}

/// Analyzer used when no backend is configured. Every analysis fails
/// without retry, so vision decks get the default layout.
struct Unconfigured;

#[async_trait]
impl VisionAnalyzer for Unconfigured {
    async fn analyze(&self, _image: &str) -> slidemap_core::Result<Value> {
        Err(slidemap_core::Error::Config(
            "No vision backend configured".to_string(),
        ))
    }
}

/// Turn a preview that names an image file into a data URL. Data URLs,
/// remote URLs and empty previews are left alone.
fn resolve_preview(base_dir: &Path, preview: &str) -> Result<String> {
    let trimmed = preview.trim();
    if trimmed.is_empty() || trimmed.starts_with("data:") || trimmed.contains("://") {
        return Ok(preview.to_string());
    }

    let path = base_dir.join(trimmed);
    if !path.is_file() {
        log::debug!("Preview {} is not a local file, passing through", trimmed);
        return Ok(preview.to_string());
    }
    image_data_url(&path)
}

fn image_data_url(path: &Path) -> Result<String> {
    let mime_type = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(mime_for_extension)
        .with_context(|| format!("Unsupported image type: {}", path.display()))?;

    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(data_url(mime_type, &bytes))
}

fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read_text(path)?;
    let value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(value)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value)?;
    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for_extension("PNG"), Some("image/png"));
        assert_eq!(mime_for_extension("jpeg"), Some("image/jpeg"));
        assert_eq!(mime_for_extension("jpg"), Some("image/jpeg"));
        assert_eq!(mime_for_extension("bmp"), None);
    }

    #[test]
    fn test_data_url() {
        assert_eq!(data_url("image/png", b"abc"), "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_resolve_preview_passes_through_urls() {
        let base = Path::new(".");
        assert_eq!(
            resolve_preview(base, "data:image/png;base64,AAAA").unwrap(),
            "data:image/png;base64,AAAA"
        );
        assert_eq!(
            resolve_preview(base, "https://cdn.example.com/slide.png").unwrap(),
            "https://cdn.example.com/slide.png"
        );
        assert_eq!(resolve_preview(base, "").unwrap(), "");
        assert_eq!(
            resolve_preview(base, "missing-slide-image.png").unwrap(),
            "missing-slide-image.png"
        );
    }

    #[test]
    fn test_args_parse_map_command() {
        let args = Args::try_parse_from([
            "slidemap", "map", "--deck", "deck.json", "--per-slide", "-v",
        ])
        .unwrap();

        assert!(args.verbose);
        match args.command {
            Command::Map {
                deck,
                content,
                per_slide,
            } => {
                assert_eq!(deck, PathBuf::from("deck.json"));
                assert!(content.is_none());
                assert!(per_slide);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
