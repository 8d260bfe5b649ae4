//! Segmentation parameters.
//!
//! Contains SegParams, the tunable thresholds used by the relation queries,
//! the segment grower and the cleanup passes.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegError};

/// Parameters for math-region segmentation.
///
/// All ratios are empirical. They are exposed so a corpus with a different
/// scan resolution or typography can be tuned without touching code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegParams {
    /// Edge length, in pixels, of a spatial grid cell.
    pub grid_cell_size: i32,

    /// A word containing a math-classified blob keeps its math blobs only if
    /// at least this fraction of its blobs is math-classified.
    pub sparseness_threshold: f64,

    /// A covered neighbor must have more area than the reference dimension
    /// divided by this value. Filters specks.
    pub cover_area_divisor: f64,

    /// A covered neighbor may be at most this fraction of the reference
    /// dimension away.
    pub cover_gap_ratio: f64,

    /// Same limit when the reference is a whole segment box. Segment boxes
    /// grow with every merge, so the allowed gap is a smaller fraction.
    pub seg_cover_gap_ratio: f64,

    /// Gap to a covered neighbor divided by the neighbor's larger dimension
    /// must stay below this value.
    pub max_gap_to_size_ratio: f64,

    /// An adjacent neighbor must have at least the reference area divided by
    /// this value.
    pub adjacency_area_divisor: f64,

    /// An adjacent neighbor may be at most this fraction of the reference
    /// size along the query axis away.
    pub adjacency_gap_ratio: f64,

    /// Each link of a stacked chain may be at most this fraction of the
    /// originating blob's height away from the previous link.
    pub stack_gap_ratio: f64,

    /// Deepest merge cascade allowed from a single seed.
    pub max_merge_depth: usize,

    /// Pixel slack of the almost-containment test used by the post-pass.
    pub containment_tolerance: i32,

    /// OCR certainty a recognition must exceed to be trusted. Certainties
    /// are non-positive, 0 being the most confident.
    pub certainty_threshold: f32,

    /// Operators need `certainty > certainty_threshold * operator_certainty_factor`.
    pub operator_certainty_factor: f32,

    /// Single characters recognized as binary operators.
    pub operators: String,

    /// Drop math labels on the topmost text row (running headers, page
    /// numbers).
    pub suppress_header_row: bool,
}

impl Default for SegParams {
    fn default() -> Self {
        Self {
            grid_cell_size: 32,
            sparseness_threshold: 0.6,
            cover_area_divisor: 32.0,
            cover_gap_ratio: 0.5,
            seg_cover_gap_ratio: 0.25,
            max_gap_to_size_ratio: 2.0,
            adjacency_area_divisor: 16.0,
            adjacency_gap_ratio: 0.5,
            stack_gap_ratio: 0.5,
            max_merge_depth: 30,
            containment_tolerance: 1,
            certainty_threshold: -5.0,
            operator_certainty_factor: 0.5,
            operators: "<>=+-".to_string(),
            suppress_header_row: true,
        }
    }
}

impl SegParams {
    /// Loads parameters from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Checks every field is inside its meaningful range.
    pub fn validate(&self) -> Result<()> {
        fn invalid(name: &'static str, msg: impl Into<String>) -> Result<()> {
            Err(SegError::InvalidParams {
                name,
                msg: msg.into(),
            })
        }
        if self.grid_cell_size < 1 {
            return invalid("grid_cell_size", "must be at least 1 pixel");
        }
        if !(0.0..=1.0).contains(&self.sparseness_threshold) {
            return invalid("sparseness_threshold", "should be a number between 0 and 1");
        }
        for (name, value) in [
            ("cover_area_divisor", self.cover_area_divisor),
            ("adjacency_area_divisor", self.adjacency_area_divisor),
            ("max_gap_to_size_ratio", self.max_gap_to_size_ratio),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return invalid(name, format!("must be positive, got {value}"));
            }
        }
        for (name, value) in [
            ("cover_gap_ratio", self.cover_gap_ratio),
            ("seg_cover_gap_ratio", self.seg_cover_gap_ratio),
            ("adjacency_gap_ratio", self.adjacency_gap_ratio),
            ("stack_gap_ratio", self.stack_gap_ratio),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return invalid(name, format!("must be non-negative, got {value}"));
            }
        }
        if self.containment_tolerance < 0 {
            return invalid("containment_tolerance", "must be non-negative");
        }
        if !self.certainty_threshold.is_finite() || !self.operator_certainty_factor.is_finite() {
            return invalid("certainty_threshold", "must be finite");
        }
        if self.operators.is_empty() {
            return invalid("operators", "needs at least one character");
        }
        Ok(())
    }

    /// Certainty an operator recognition must exceed.
    pub fn operator_certainty(&self) -> f32 {
        self.certainty_threshold * self.operator_certainty_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = SegParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.max_merge_depth, 30);
        assert_eq!(params.operator_certainty(), -2.5);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let params = SegParams::from_json(r#"{"sparseness_threshold": 0.75}"#).unwrap();
        assert_eq!(params.sparseness_threshold, 0.75);
        assert_eq!(params.grid_cell_size, 32);
        assert_eq!(params.operators, "<>=+-");
        assert_eq!(params.seg_cover_gap_ratio, 0.25);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let err = SegParams::from_json(r#"{"sparseness_threshold": 1.5}"#).unwrap_err();
        assert!(matches!(
            err,
            SegError::InvalidParams {
                name: "sparseness_threshold",
                ..
            }
        ));
        let params = SegParams {
            grid_cell_size: 0,
            ..SegParams::default()
        };
        assert!(params.validate().is_err());
        let err = SegParams::from_json(r#"{"seg_cover_gap_ratio": -0.1}"#).unwrap_err();
        assert!(matches!(
            err,
            SegError::InvalidParams {
                name: "seg_cover_gap_ratio",
                ..
            }
        ));
    }
}
