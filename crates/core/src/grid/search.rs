//! Lazy beam searches over a [`SpatialGrid`].
//!
//! A beam walks cell columns (or rows) outward from its origin. Hits found
//! in a column go into a min-heap keyed by distance; a hit is released only
//! once no unscanned column could still hold something nearer, so the
//! stream is globally ordered by distance (ties broken by id) while callers
//! that stop early never pay for the far end of the page.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::FxHashSet;

use super::{ElemId, SpatialGrid};
use crate::utils::{BoundingBox, Direction, HasBBox};

/// One element reported by a beam search.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BeamHit {
    pub id: ElemId,
    /// Distance from the beam origin to the element's near edge.
    pub distance: i32,
}

pub struct BeamSearch<'a, T> {
    grid: &'a SpatialGrid<T>,
    dir: Direction,
    origin: i32,
    /// Slab extent on the cross axis.
    span: (i32, i32),
    /// Cells on the cross axis covered by `span`.
    cross: (usize, usize),
    next_line: Option<usize>,
    /// Smallest distance any unscanned element can have; `None` once every
    /// line has been scanned.
    floor: Option<i32>,
    seen: FxHashSet<usize>,
    pending: BinaryHeap<Reverse<(i32, usize)>>,
    skip: Option<ElemId>,
}

impl<'a, T: HasBBox> BeamSearch<'a, T> {
    pub(super) fn new(
        grid: &'a SpatialGrid<T>,
        dir: Direction,
        origin: i32,
        span: (i32, i32),
    ) -> Self {
        let (lo, hi) = (span.0.min(span.1), span.0.max(span.1));
        let (cross, start) = if dir.is_horizontal() {
            ((grid.row_of(lo), grid.row_of(hi)), grid.col_of(origin))
        } else {
            ((grid.col_of(lo), grid.col_of(hi)), grid.row_of(origin))
        };
        Self {
            grid,
            dir,
            origin,
            span: (lo, hi),
            cross,
            next_line: Some(start),
            floor: Some(i32::MIN),
            seen: FxHashSet::default(),
            pending: BinaryHeap::new(),
            skip: None,
        }
    }

    /// Leaves `origin` out of the results; used when the beam is anchored on
    /// the element whose neighbors are being looked for.
    pub fn skip_origin(mut self, origin: ElemId) -> Self {
        self.skip = Some(origin);
        self
    }

    /// Distance from the origin to the near edge of `bbox`, or `None` when
    /// the box lies outside the beam.
    fn distance_to(&self, bbox: &BoundingBox) -> Option<i32> {
        let (lo, hi) = self.span;
        let in_slab = if self.dir.is_horizontal() {
            bbox.bottom <= hi && bbox.top >= lo
        } else {
            bbox.left <= hi && bbox.right >= lo
        };
        if !in_slab {
            return None;
        }
        let o = self.origin;
        match self.dir {
            Direction::Right => (bbox.right >= o).then(|| bbox.left - o),
            Direction::Left => (bbox.left <= o).then(|| o - bbox.right),
            Direction::Up => (bbox.top >= o).then(|| bbox.bottom - o),
            Direction::Down => (bbox.bottom <= o).then(|| o - bbox.top),
        }
    }

    fn scan_line(&mut self, line: usize) {
        let grid = self.grid;
        for cross in self.cross.0..=self.cross.1 {
            let bucket = if self.dir.is_horizontal() {
                grid.bucket(line, cross)
            } else {
                grid.bucket(cross, line)
            };
            for &id in bucket {
                if !self.seen.insert(id) || self.skip == Some(ElemId(id)) {
                    continue;
                }
                let Some(bbox) = grid.slot_bbox(id) else {
                    continue;
                };
                if let Some(d) = self.distance_to(&bbox) {
                    self.pending.push(Reverse((d, id)));
                }
            }
        }
    }

    /// Moves past `line` and recomputes the distance floor for what is left.
    fn advance(&mut self, line: usize) {
        let (cols, rows) = self.grid.dimensions();
        let lines = if self.dir.is_horizontal() { cols } else { rows };
        let last = lines - 1;
        let next = if self.dir.is_ascending() {
            (line < last).then_some(line + 1)
        } else {
            line.checked_sub(1)
        };
        self.next_line = next;
        self.floor = next.map(|_| match self.dir {
            // Anything unscanned starts in a later column.
            Direction::Right => self.grid.col_start(line + 1) - self.origin,
            Direction::Up => self.grid.row_start(line + 1) - self.origin,
            // Anything unscanned ends before this column starts.
            Direction::Left => self.origin - self.grid.col_start(line) + 1,
            Direction::Down => self.origin - self.grid.row_start(line) + 1,
        });
    }
}

impl<T: HasBBox> Iterator for BeamSearch<'_, T> {
    type Item = BeamHit;

    fn next(&mut self) -> Option<BeamHit> {
        loop {
            if let Some(&Reverse((distance, id))) = self.pending.peek()
                && self.floor.is_none_or(|floor| distance < floor)
            {
                self.pending.pop();
                return Some(BeamHit {
                    id: ElemId(id),
                    distance,
                });
            }
            let line = self.next_line?;
            self.scan_line(line);
            self.advance(line);
        }
    }
}
