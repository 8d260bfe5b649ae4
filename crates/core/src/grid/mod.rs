//! Bucketed spatial index over bounding boxes.
//!
//! The page is cut into square cells of `cell_size` pixels. Every element is
//! registered in each cell its box touches; queries walk only the cells they
//! need and de-duplicate, so an element spanning many cells is still
//! reported once. Element ids are slot indices, assigned on insertion and
//! never reused, which gives every enumeration a stable ascending order.

pub mod search;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{Result, SegError};
use crate::utils::{BoundingBox, Direction, HasBBox, MAX_COORD};

pub use search::{BeamHit, BeamSearch};

/// Identifier of an element stored in a [`SpatialGrid`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElemId(pub usize);

impl std::fmt::Display for ElemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Bucket = SmallVec<[usize; 8]>;

/// Upper bound on the bucket count; larger extents get coarser cells.
const MAX_CELLS: usize = 1 << 20;

pub struct SpatialGrid<T> {
    /// Bottom-left corner of cell (0, 0).
    origin_x: i32,
    origin_y: i32,
    cell_size: i32,
    cols: usize,
    rows: usize,
    /// Row-major cell membership.
    buckets: Vec<Bucket>,
    /// Elements in insertion order (id == index); `None` once removed.
    slots: Vec<Option<T>>,
    /// Box each element was bucketed under.
    bboxes: Vec<BoundingBox>,
    live: usize,
}

impl<T: HasBBox> SpatialGrid<T> {
    /// Creates an empty grid covering `bounds`.
    ///
    /// Elements falling partly or wholly outside `bounds` are still indexed:
    /// they are clamped into the border cells. When `bounds` would need more
    /// than `MAX_CELLS` buckets the cell size is doubled until it fits.
    ///
    /// Coordinates are expected within `±MAX_COORD`; `bounds` and
    /// `cell_size` are clamped to that range.
    pub fn new(bounds: BoundingBox, cell_size: i32) -> Self {
        let clamp = |v: i32| v.clamp(-MAX_COORD, MAX_COORD);
        let bounds = BoundingBox::new(
            clamp(bounds.left),
            clamp(bounds.bottom),
            clamp(bounds.right),
            clamp(bounds.top),
        );
        let (width, height) = (bounds.width().max(0), bounds.height().max(0));
        let mut cell_size = cell_size.clamp(1, MAX_COORD);
        let (cols, rows) = loop {
            let cols = (width / cell_size) as usize + 1;
            let rows = (height / cell_size) as usize + 1;
            if cols.saturating_mul(rows) <= MAX_CELLS {
                break (cols, rows);
            }
            cell_size = cell_size.saturating_mul(2);
        };
        Self {
            origin_x: bounds.left,
            origin_y: bounds.bottom,
            cell_size,
            cols,
            rows,
            buckets: vec![Bucket::new(); cols * rows],
            slots: Vec::new(),
            bboxes: Vec::new(),
            live: 0,
        }
    }

    pub fn cell_size(&self) -> i32 {
        self.cell_size
    }

    /// Grid dimensions as `(columns, rows)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Adds an element and returns its id.
    pub fn insert(&mut self, obj: T) -> ElemId {
        let id = self.slots.len();
        let bbox = obj.bbox();
        let (c0, c1) = self.col_span(bbox.left, bbox.right);
        let (r0, r1) = self.row_span(bbox.bottom, bbox.top);
        for row in r0..=r1 {
            for col in c0..=c1 {
                self.buckets[row * self.cols + col].push(id);
            }
        }
        self.slots.push(Some(obj));
        self.bboxes.push(bbox);
        self.live += 1;
        ElemId(id)
    }

    /// Removes an element, handing it back to the caller.
    ///
    /// Removing an id that was never inserted, or was already removed, is a
    /// caller bug and is reported as [`SegError::NotInGrid`].
    pub fn remove(&mut self, id: ElemId) -> Result<T> {
        let obj = self
            .slots
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(SegError::NotInGrid(id.0))?;
        let bbox = self.bboxes[id.0];
        let (c0, c1) = self.col_span(bbox.left, bbox.right);
        let (r0, r1) = self.row_span(bbox.bottom, bbox.top);
        for row in r0..=r1 {
            for col in c0..=c1 {
                self.buckets[row * self.cols + col].retain(|e| *e != id.0);
            }
        }
        self.live -= 1;
        Ok(obj)
    }

    pub fn get(&self, id: ElemId) -> Option<&T> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Mutable access to an element.
    ///
    /// The element's box must not change through this reference: it stays
    /// bucketed under the box it was inserted with.
    pub fn get_mut(&mut self, id: ElemId) -> Option<&mut T> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: ElemId) -> bool {
        self.get(id).is_some()
    }

    /// Box of a live element.
    pub fn bbox(&self, id: ElemId) -> Option<BoundingBox> {
        self.get(id).map(|_| self.bboxes[id.0])
    }

    /// Every live element exactly once, in ascending id order.
    pub fn full_scan(&self) -> impl Iterator<Item = ElemId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| ElemId(i))
    }

    /// Live elements paired with their values, in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (ElemId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|obj| (ElemId(i), obj)))
    }

    /// All elements whose box intersects `area` (shared edges count),
    /// in ascending id order.
    pub fn rect_search(&self, area: BoundingBox) -> Vec<ElemId> {
        let (c0, c1) = self.col_span(area.left, area.right);
        let (r0, r1) = self.row_span(area.bottom, area.top);
        let mut hits: Vec<usize> = Vec::new();
        for row in r0..=r1 {
            for col in c0..=c1 {
                for &id in &self.buckets[row * self.cols + col] {
                    if self.bboxes[id].intersects(&area) {
                        hits.push(id);
                    }
                }
            }
        }
        hits.sort_unstable();
        hits.dedup();
        hits.into_iter().map(ElemId).collect()
    }

    /// Beam search along the x axis.
    ///
    /// Yields elements whose box overlaps the horizontal slab
    /// `[y_low, y_high]` and reaches `x` or beyond in `dir`, nearest first.
    /// Distance is measured from `x` to the element's near edge, so an
    /// element straddling `x` has a negative distance.
    ///
    /// # Panics
    /// Panics if `dir` is not [`Direction::Left`] or [`Direction::Right`].
    pub fn side_search(
        &self,
        x: i32,
        y_low: i32,
        y_high: i32,
        dir: Direction,
    ) -> BeamSearch<'_, T> {
        assert!(dir.is_horizontal(), "side_search needs a horizontal direction, got {dir}");
        BeamSearch::new(self, dir, x, (y_low, y_high))
    }

    /// Beam search along the y axis; the vertical twin of
    /// [`side_search`](Self::side_search).
    ///
    /// # Panics
    /// Panics if `dir` is not [`Direction::Up`] or [`Direction::Down`].
    pub fn vertical_search(
        &self,
        x_low: i32,
        x_high: i32,
        y: i32,
        dir: Direction,
    ) -> BeamSearch<'_, T> {
        assert!(!dir.is_horizontal(), "vertical_search needs a vertical direction, got {dir}");
        BeamSearch::new(self, dir, y, (x_low, x_high))
    }

    pub(crate) fn col_of(&self, x: i32) -> usize {
        let c = (x - self.origin_x).div_euclid(self.cell_size);
        c.clamp(0, self.cols as i32 - 1) as usize
    }

    pub(crate) fn row_of(&self, y: i32) -> usize {
        let r = (y - self.origin_y).div_euclid(self.cell_size);
        r.clamp(0, self.rows as i32 - 1) as usize
    }

    fn col_span(&self, lo: i32, hi: i32) -> (usize, usize) {
        let (a, b) = (self.col_of(lo), self.col_of(hi));
        (a.min(b), a.max(b))
    }

    fn row_span(&self, lo: i32, hi: i32) -> (usize, usize) {
        let (a, b) = (self.row_of(lo), self.row_of(hi));
        (a.min(b), a.max(b))
    }

    /// Lowest x coordinate mapped to column `col` (for `col >= 1`).
    pub(crate) fn col_start(&self, col: usize) -> i32 {
        self.origin_x + col as i32 * self.cell_size
    }

    pub(crate) fn row_start(&self, row: usize) -> i32 {
        self.origin_y + row as i32 * self.cell_size
    }

    pub(crate) fn bucket(&self, col: usize, row: usize) -> &[usize] {
        &self.buckets[row * self.cols + col]
    }

    pub(crate) fn slot_bbox(&self, id: usize) -> Option<BoundingBox> {
        self.slots
            .get(id)
            .and_then(|s| s.as_ref())
            .map(|_| self.bboxes[id])
    }
}
