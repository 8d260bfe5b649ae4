//! Segmentation analysis: relation queries, the segment grower and the
//! cleanup passes around it.

pub mod cleanup;
pub mod relations;
pub mod segmenter;

pub use cleanup::{
    PrepassReport, merge_contained_segments, run_prepass, suppress_header_row,
    suppress_sparse_words,
};
pub use relations::{CoverMode, RelationQueries};
pub use segmenter::{
    GrowthOutcome, PageSegmentation, SegmentationStats, Segmenter, detection_segments,
};
