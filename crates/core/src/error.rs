//! Error types for the mathseg segmentation library.

use thiserror::Error;

use crate::utils::BoundingBox;

/// Primary error type for page segmentation.
#[derive(Error, Debug)]
pub enum SegError {
    #[error("malformed bounding box for blob {index}: {bbox} (left > right or bottom > top)")]
    MalformedBox { index: usize, bbox: BoundingBox },

    #[error("bounding box for blob {index} is out of range: {bbox}")]
    BoxOutOfRange { index: usize, bbox: BoundingBox },

    #[error("page size {width}x{height} is out of range")]
    PageSize { width: i32, height: i32 },

    #[error("element {0} is not present in the grid")]
    NotInGrid(usize),

    #[error("unknown segment id: {0}")]
    UnknownSegment(usize),

    #[error("invalid parameter {name}: {msg}")]
    InvalidParams { name: &'static str, msg: String },

    #[error("rect line {line}: {msg}")]
    RectSyntax { line: usize, msg: String },

    #[error("thread pool error: {0}")]
    ThreadPool(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type alias for SegError.
pub type Result<T> = std::result::Result<T, SegError>;
