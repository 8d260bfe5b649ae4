//! Blob elements and the recognition data attached to them.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::segment::SegmentId;
use crate::grid::ElemId;
use crate::utils::{BoundingBox, Direction, HasBBox};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordId(pub usize);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub usize);

/// What the OCR engine reported about the word and row a blob sits in.
///
/// Read-only for the segmentation passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionContext {
    pub word: Option<WordId>,
    pub row: Option<RowId>,
    /// Recognized text of the enclosing word.
    pub text: Option<String>,
    /// OCR certainty of the word; 0 is best, more negative is worse.
    pub certainty: f32,
    pub is_valid_word: bool,
    pub is_stop_word: bool,
    /// The word was found in the math-word dictionary.
    pub is_math_word: bool,
    pub is_italic: bool,
    /// The blob lies on a row the layout engine considers ordinary text.
    pub on_normal_row: bool,
}

impl RecognitionContext {
    /// Certainty given to blobs the OCR engine never recognized.
    pub const UNRECOGNIZED_CERTAINTY: f32 = -20.0;

    pub fn is_confident(&self, threshold: f32) -> bool {
        self.word.is_some() && self.certainty > threshold
    }

    /// A valid dictionary word that is not a math word, recognized with a
    /// certainty above `threshold`.
    pub fn is_confident_prose(&self, threshold: f32) -> bool {
        self.is_confident(threshold) && self.is_valid_word && !self.is_math_word
    }
}

impl Default for RecognitionContext {
    fn default() -> Self {
        Self {
            word: None,
            row: None,
            text: None,
            certainty: Self::UNRECOGNIZED_CERTAINTY,
            is_valid_word: false,
            is_stop_word: false,
            is_math_word: false,
            is_italic: false,
            on_normal_row: false,
        }
    }
}

type Candidates = SmallVec<[ElemId; 4]>;

/// Merge candidates found by the most recent decision made from a blob.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingMerges {
    pub up: Candidates,
    pub down: Candidates,
    pub left: Candidates,
    pub right: Candidates,
    pub intersecting: Candidates,
}

impl PendingMerges {
    pub fn direction_mut(&mut self, dir: Direction) -> &mut Candidates {
        match dir {
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
        }
    }

    pub fn direction(&self, dir: Direction) -> &[ElemId] {
        match dir {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
            Direction::Left => &self.left,
            Direction::Right => &self.right,
        }
    }

    /// All candidates: directional lists first, then intersecting ones.
    pub fn iter(&self) -> impl Iterator<Item = ElemId> + '_ {
        self.up
            .iter()
            .chain(&self.down)
            .chain(&self.left)
            .chain(&self.right)
            .chain(&self.intersecting)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.up.len()
            + self.down.len()
            + self.left.len()
            + self.right.len()
            + self.intersecting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeState {
    /// Owning segment; `None` while unclaimed.
    pub segment: Option<SegmentId>,
    pub pending: PendingMerges,
    pub processed: bool,
    /// Segment area when the last decision was made from this blob.
    pub processed_area: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlobElement {
    pub bbox: BoundingBox,
    /// Classifier label; claiming sets it.
    pub is_math: bool,
    pub recognition: RecognitionContext,
    pub merge: MergeState,
}

impl BlobElement {
    pub fn new(bbox: BoundingBox, is_math: bool, recognition: RecognitionContext) -> Self {
        Self {
            bbox,
            is_math,
            recognition,
            merge: MergeState::default(),
        }
    }

    pub fn segment(&self) -> Option<SegmentId> {
        self.merge.segment
    }

    pub fn is_claimed(&self) -> bool {
        self.merge.segment.is_some()
    }

    pub fn on_normal_row(&self) -> bool {
        self.recognition.on_normal_row
    }

    /// Claims the blob for `segment`. Returns false, leaving the blob alone,
    /// when it already belongs to a segment.
    pub(crate) fn claim(&mut self, segment: SegmentId) -> bool {
        if self.merge.segment.is_some() {
            return false;
        }
        self.merge.segment = Some(segment);
        self.is_math = true;
        true
    }

    /// Moves an already-claimed blob to another segment. Only the
    /// containment pass does this.
    pub(crate) fn reassign(&mut self, segment: SegmentId) {
        self.merge.segment = Some(segment);
    }
}

impl HasBBox for BlobElement {
    fn bbox(&self) -> BoundingBox {
        self.bbox
    }
}
