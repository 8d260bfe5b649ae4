//! Serialized page input handed over by the OCR stage.
//!
//! A page file is JSON, either one page object or an array of them:
//!
//! ```json
//! {
//!   "name": "scan-004.png",
//!   "width": 2550,
//!   "height": 3300,
//!   "blobs": [
//!     { "bbox": {"left": 10, "bottom": 20, "right": 30, "top": 50},
//!       "is_math": true,
//!       "recognition": {"word": 0, "row": 0, "certainty": -1.2, "on_normal_row": true} }
//!   ]
//! }
//! ```

use std::io::Read;

use serde::{Deserialize, Serialize};

use super::blob::{BlobElement, RecognitionContext};
use crate::error::{Result, SegError};
use crate::utils::{BoundingBox, MAX_COORD};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobInput {
    pub bbox: BoundingBox,
    #[serde(default)]
    pub is_math: bool,
    #[serde(default)]
    pub recognition: RecognitionContext,
}

impl BlobInput {
    pub fn new(bbox: BoundingBox, is_math: bool) -> Self {
        Self {
            bbox,
            is_math,
            recognition: RecognitionContext::default(),
        }
    }

    pub fn with_recognition(mut self, recognition: RecognitionContext) -> Self {
        self.recognition = recognition;
        self
    }

    pub(crate) fn to_element(&self) -> BlobElement {
        BlobElement::new(self.bbox, self.is_math, self.recognition.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageInput {
    #[serde(default)]
    pub name: String,
    /// Page image size in pixels.
    pub width: i32,
    pub height: i32,
    pub blobs: Vec<BlobInput>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageFile {
    One(PageInput),
    Many(Vec<PageInput>),
}

impl PageInput {
    pub fn new(name: impl Into<String>, width: i32, height: i32, blobs: Vec<BlobInput>) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            blobs,
        }
    }

    /// Rejects a page size outside `0..=MAX_COORD` and the first blob whose
    /// box is malformed or out of range.
    pub fn validate(&self) -> Result<()> {
        if !(0..=MAX_COORD).contains(&self.width) || !(0..=MAX_COORD).contains(&self.height) {
            return Err(SegError::PageSize {
                width: self.width,
                height: self.height,
            });
        }
        self.blobs
            .iter()
            .enumerate()
            .try_for_each(|(index, b)| check_box(index, b.bbox))
    }
}

/// Checks a blob box is well formed and within `±MAX_COORD`.
pub(crate) fn check_box(index: usize, bbox: BoundingBox) -> Result<()> {
    if !bbox.is_well_formed() {
        return Err(SegError::MalformedBox { index, bbox });
    }
    if !bbox.is_in_range() {
        return Err(SegError::BoxOutOfRange { index, bbox });
    }
    Ok(())
}

/// Reads one page or an array of pages from JSON.
pub fn load_pages<R: Read>(reader: R) -> Result<Vec<PageInput>> {
    Ok(match serde_json::from_reader(reader)? {
        PageFile::One(page) => vec![page],
        PageFile::Many(pages) => pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_single_and_array() {
        let one = r#"{"width": 100, "height": 50,
            "blobs": [{"bbox": {"left": 1, "bottom": 2, "right": 3, "top": 4}}]}"#;
        let pages = load_pages(one.as_bytes()).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(!pages[0].blobs[0].is_math);
        assert_eq!(pages[0].name, "");

        let many = format!("[{one}, {one}]");
        assert_eq!(load_pages(many.as_bytes()).unwrap().len(), 2);
    }

    #[test]
    fn test_validate_names_first_bad_blob() {
        let page = PageInput::new(
            "p",
            10,
            10,
            vec![
                BlobInput::new(BoundingBox::new(0, 0, 1, 1), true),
                BlobInput::new(BoundingBox::new(5, 0, 4, 1), true),
            ],
        );
        match page.validate() {
            Err(SegError::MalformedBox { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected MalformedBox, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_coordinates_out_of_range() {
        let far = PageInput::new(
            "p",
            100,
            100,
            vec![
                BlobInput::new(BoundingBox::new(-5, 10, 20, 130), true),
                BlobInput::new(BoundingBox::new(1_000_000_000, 0, 1_000_000_010, 10), true),
            ],
        );
        match far.validate() {
            Err(SegError::BoxOutOfRange { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected BoxOutOfRange, got {other:?}"),
        }

        let huge = PageInput::new("p", i32::MAX, 100, Vec::new());
        assert!(matches!(huge.validate(), Err(SegError::PageSize { .. })));
        let negative = PageInput::new("p", 100, -1, Vec::new());
        assert!(matches!(negative.validate(), Err(SegError::PageSize { .. })));
    }
}
