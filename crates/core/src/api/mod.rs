//! High-level API for segmenting pages.
//!
//! # Example
//!
//! ```ignore
//! use mathseg_core::api::{segment_pages, SegmentOptions};
//! use mathseg_core::page::load_pages;
//!
//! let pages = load_pages(std::fs::File::open("scan.json")?)?;
//! let results = segment_pages(&pages, &SegmentOptions::default())?;
//! ```

pub mod high_level;

pub use high_level::{SegmentOptions, detect_page, segment_page, segment_pages};
