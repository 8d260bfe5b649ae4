//! Page model: blobs indexed in a spatial grid plus the segments grown
//! over them.

pub mod blob;
pub mod input;
pub mod segment;

pub use blob::{BlobElement, MergeState, PendingMerges, RecognitionContext, RowId, WordId};
pub use input::{BlobInput, PageInput, load_pages};
pub use segment::{Segment, SegmentArena, SegmentId, SegmentKind};

use crate::error::{Result, SegError};
use crate::grid::{ElemId, SpatialGrid};
use crate::page::input::check_box;
use crate::params::SegParams;
use crate::utils::BoundingBox;

/// Everything one segmentation run owns for a single page.
pub struct PageGrid {
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub blobs: SpatialGrid<BlobElement>,
    pub segments: SegmentArena,
}

impl PageGrid {
    /// Creates an empty page. The grid spans the page rectangle; blobs
    /// outside it land in the border cells.
    pub fn new(name: impl Into<String>, width: i32, height: i32, cell_size: i32) -> Self {
        let bounds = BoundingBox::new(0, 0, width.max(0), height.max(0));
        Self {
            name: name.into(),
            width,
            height,
            blobs: SpatialGrid::new(bounds, cell_size),
            segments: SegmentArena::new(),
        }
    }

    /// Builds the grid for `input`, inserting blobs in input order so that
    /// element ids equal input indices.
    pub fn from_input(input: &PageInput, params: &SegParams) -> Result<Self> {
        input.validate()?;
        let mut page = Self::new(
            input.name.clone(),
            input.width,
            input.height,
            params.grid_cell_size,
        );
        for blob in &input.blobs {
            page.blobs.insert(blob.to_element());
        }
        Ok(page)
    }

    /// Adds a blob after checking its box is well formed and in range.
    pub fn insert_blob(&mut self, blob: BlobElement) -> Result<ElemId> {
        check_box(self.blobs.full_scan().count(), blob.bbox)?;
        Ok(self.blobs.insert(blob))
    }

    pub fn blob(&self, id: ElemId) -> Result<&BlobElement> {
        self.blobs.get(id).ok_or(SegError::NotInGrid(id.0))
    }

    pub fn blob_mut(&mut self, id: ElemId) -> Result<&mut BlobElement> {
        self.blobs.get_mut(id).ok_or(SegError::NotInGrid(id.0))
    }

    /// Opens a segment seeded by `seed` and claims the seed for it.
    ///
    /// The kind is `Embedded` when the seed sits on a normal text row and
    /// `Displayed` otherwise. A seed that already belongs to a segment keeps
    /// it, and that segment's id is returned.
    pub fn open_segment(&mut self, seed: ElemId) -> Result<SegmentId> {
        let (bbox, on_normal_row) = {
            let blob = self.blob(seed)?;
            if let Some(existing) = blob.segment() {
                return Ok(existing);
            }
            (blob.bbox, blob.on_normal_row())
        };
        let kind = if on_normal_row {
            SegmentKind::Embedded
        } else {
            SegmentKind::Displayed
        };
        let id = self.segments.create(seed, bbox, kind);
        self.blob_mut(seed)?.claim(id);
        Ok(id)
    }

    /// Claims `elem` for `segment` and grows the segment box.
    ///
    /// Returns `Ok(false)` when the blob already belongs to a segment; that
    /// is the normal outcome of two growths racing for the same neighbor.
    pub fn claim(&mut self, elem: ElemId, segment: SegmentId) -> Result<bool> {
        self.segments.get(segment)?;
        let blob = self.blob_mut(elem)?;
        if !blob.claim(segment) {
            return Ok(false);
        }
        let bbox = blob.bbox;
        self.segments.add_member(segment, elem, bbox)?;
        Ok(true)
    }

    /// Folds segment `from` into `into`, moving every member blob over.
    pub(crate) fn merge_segments(&mut self, into: SegmentId, from: SegmentId) -> Result<usize> {
        let moved = self.segments.absorb(into, from)?;
        for &elem in &moved {
            self.blob_mut(elem)?.reassign(into);
        }
        Ok(moved.len())
    }

    pub fn segment_box(&self, id: SegmentId) -> Result<BoundingBox> {
        self.segments.bbox(id)
    }

    /// Recomputes a segment's box from its members.
    pub fn union_of_members(&self, id: SegmentId) -> Result<Option<BoundingBox>> {
        self.segments.union_of_members(id, |e| self.blobs.bbox(e))
    }

    /// Elements currently labelled math.
    pub fn math_blobs(&self) -> impl Iterator<Item = ElemId> + '_ {
        self.blobs.iter().filter(|(_, b)| b.is_math).map(|(id, _)| id)
    }
}
