//! Core slide layout model, vision response normalization, content-to-area
//! mapping, and batched slide content updates.

pub mod error;
pub mod mapper;
pub mod normalize;
pub mod response;
pub mod store;
pub mod types;

pub use error::{Error, Result};
pub use mapper::{default_mapping, vision_text_areas, MappingStrategy};
pub use normalize::{normalize_coordinate, validate_element_type};
pub use response::parse_vision_response;
pub use store::{apply_batch, ActivityEntry, BatchOutcome, ContentUpdate, SlideContentStore};
pub use types::{
    AreaMapping, AreaPosition, ContentPayload, Coordinates, ElementStyle, ElementType,
    Formatting, Slide, SlideLayout, SlideMapping, SlideMetadata, TextAlign, TextArea,
    VisionElement, VisionResult,
};
