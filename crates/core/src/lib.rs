//! mathseg - groups math-classified OCR blobs into math-expression regions.

pub mod analysis;
pub mod api;
pub mod converter;
pub mod error;
pub mod grid;
pub mod page;
pub mod params;
pub mod utils;

// Re-export for convenience
pub use analysis::{PageSegmentation, Segmenter};
pub use api::high_level;
pub use grid::{ElemId, SpatialGrid};
pub use page::{PageGrid, PageInput, Segment, SegmentKind};
pub use params::SegParams;
pub use utils::{BoundingBox, Direction};

pub use error::{Result, SegError};
