//! Geometric relations between blobs: coverage, vertical stacking,
//! adjacency and operator detection.
//!
//! The same queries serve two callers. Feature extraction asks about a lone
//! blob (reference box = the blob's own box); the segment grower asks on
//! behalf of a whole segment (reference box = the current segment box).

use rustc_hash::FxHashSet;

use crate::error::{Result, SegError};
use crate::grid::{ElemId, SpatialGrid};
use crate::page::BlobElement;
use crate::params::SegParams;
use crate::utils::{BoundingBox, Direction};

/// Whether blobs on ordinary text rows take part in coverage.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CoverMode {
    /// Normal-row blobs neither cover nor get covered.
    ExcludeNormalText,
    IncludeNormalText,
}

pub struct RelationQueries<'a> {
    grid: &'a SpatialGrid<BlobElement>,
    params: &'a SegParams,
}

impl<'a> RelationQueries<'a> {
    pub fn new(grid: &'a SpatialGrid<BlobElement>, params: &'a SegParams) -> Self {
        Self { grid, params }
    }

    fn blob(&self, id: ElemId) -> Result<&'a BlobElement> {
        self.grid.get(id).ok_or(SegError::NotInGrid(id.0))
    }

    /// Number of blobs `elem` covers in `dir`, measured from its own box.
    pub fn count_covered(&self, elem: ElemId, dir: Direction, mode: CoverMode) -> Result<usize> {
        Ok(self.covered(elem, dir, mode)?.len())
    }

    /// Blobs `elem` covers in `dir`, in the order they were found.
    pub fn covered(&self, elem: ElemId, dir: Direction, mode: CoverMode) -> Result<Vec<ElemId>> {
        let reference = self.blob(elem)?.bbox;
        self.sweep(elem, reference, dir, mode, self.params.cover_gap_ratio)
    }

    /// Coverage seen from a segment box on behalf of its member `origin`.
    ///
    /// Same sweep as [`covered`](Self::covered), but a segment box is
    /// larger than any one blob, so the allowed gap is the tighter
    /// `seg_cover_gap_ratio`.
    pub fn covered_from(
        &self,
        origin: ElemId,
        reference: BoundingBox,
        dir: Direction,
        mode: CoverMode,
    ) -> Result<Vec<ElemId>> {
        self.sweep(origin, reference, dir, mode, self.params.seg_cover_gap_ratio)
    }

    /// Sweeps `reference` one pixel line at a time (rows for horizontal
    /// directions, columns for vertical ones). On each line the nearest
    /// unclaimed blob strictly beyond the reference edge that has not been
    /// judged yet is tested for coverage; whatever the verdict, it is not
    /// tested again.
    fn sweep(
        &self,
        origin: ElemId,
        reference: BoundingBox,
        dir: Direction,
        mode: CoverMode,
        gap_ratio: f64,
    ) -> Result<Vec<ElemId>> {
        let origin_blob = self.blob(origin)?;
        let exclude_normal = mode == CoverMode::ExcludeNormalText;
        if exclude_normal && origin_blob.on_normal_row() {
            return Ok(Vec::new());
        }

        let edge = reference.edge(dir);
        let (lo, range) = if dir.is_horizontal() {
            (reference.bottom, reference.height())
        } else {
            (reference.left, reference.width())
        };

        let mut judged: FxHashSet<ElemId> = FxHashSet::default();
        let mut covered = Vec::new();
        for i in 0..range {
            let line = lo + i;
            let beam = if dir.is_horizontal() {
                self.grid.side_search(edge, line, line + 1, dir)
            } else {
                self.grid.vertical_search(line, line + 1, edge, dir)
            };
            let next = beam.skip_origin(origin).find(|hit| {
                // Strictly beyond the edge, never judged, not already taken.
                hit.distance > 0
                    && !judged.contains(&hit.id)
                    && self.grid.get(hit.id).is_some_and(|b| !b.is_claimed())
            });
            let Some(hit) = next else {
                continue;
            };
            judged.insert(hit.id);
            let neighbor = self.blob(hit.id)?;
            if exclude_normal && neighbor.on_normal_row() {
                continue;
            }
            if self.covered_within(&neighbor.bbox, &reference, dir, gap_ratio) {
                covered.push(hit.id);
            }
        }
        Ok(covered)
    }

    /// Whether `neighbor` is covered by `reference` in `dir`.
    ///
    /// The neighbor's centerline must fall inside the reference span, its
    /// gap must be small relative to the reference, its area must not be a
    /// speck, and it must not be tiny relative to its own distance.
    pub fn is_neighbor_covered(
        &self,
        neighbor: &BoundingBox,
        reference: &BoundingBox,
        dir: Direction,
    ) -> bool {
        self.covered_within(neighbor, reference, dir, self.params.cover_gap_ratio)
    }

    fn covered_within(
        &self,
        neighbor: &BoundingBox,
        reference: &BoundingBox,
        dir: Direction,
        gap_ratio: f64,
    ) -> bool {
        let p = self.params;
        let (lower, upper, dim, center) = if dir.is_horizontal() {
            (reference.bottom, reference.top, reference.height(), neighbor.center_y())
        } else {
            (reference.left, reference.right, reference.width(), neighbor.center_x())
        };
        if center < lower || center > upper {
            return false;
        }
        let gap = f64::from(reference.gap_toward(neighbor, dir));
        let dim = f64::from(dim);
        if gap > dim * gap_ratio {
            return false;
        }
        if neighbor.area() as f64 <= dim / p.cover_area_divisor {
            return false;
        }
        let size = f64::from(neighbor.max_dimension());
        size > 0.0 && gap / size < p.max_gap_to_size_ratio
    }

    /// Length of the stacked chain above or below `elem`.
    ///
    /// # Panics
    /// Panics if `dir` is horizontal.
    pub fn count_stacked(&self, elem: ElemId, dir: Direction) -> Result<usize> {
        Ok(self.stacked(elem, dir)?.len())
    }

    /// The chain of blobs stacked on `elem` in `dir`, nearest first.
    ///
    /// Each link must lie past the previous one, overlap it horizontally,
    /// and be adjacent to it with `elem`'s box as the size reference. A
    /// link that belongs to a valid word or a normal row ends the chain
    /// without being counted.
    ///
    /// # Panics
    /// Panics if `dir` is horizontal.
    pub fn stacked(&self, elem: ElemId, dir: Direction) -> Result<Vec<ElemId>> {
        assert!(!dir.is_horizontal(), "stacking is only defined up or down, got {dir}");
        let central = self.blob(elem)?.bbox;
        let mut chain: Vec<ElemId> = Vec::new();
        let mut prev = central;
        let beam = self
            .grid
            .vertical_search(central.left, central.right, central.edge(dir), dir)
            .skip_origin(elem);
        for hit in beam {
            if chain.contains(&hit.id) {
                continue;
            }
            let candidate = self.blob(hit.id)?;
            let b = candidate.bbox;
            let beyond_prev = match dir {
                Direction::Up => b.bottom >= prev.top,
                _ => b.top <= prev.bottom,
            };
            let overlaps_prev = b.left < prev.right && b.right > prev.left;
            if b == prev || !beyond_prev || !overlaps_prev {
                continue;
            }
            if candidate.recognition.is_valid_word || candidate.on_normal_row() {
                break;
            }
            if !self.adjacent_within(&b, &prev, dir, &central, self.params.stack_gap_ratio) {
                break;
            }
            chain.push(hit.id);
            prev = b;
        }
        Ok(chain)
    }

    /// Whether `neighbor` sits next to `current` in `dir`.
    ///
    /// Sizes come from `reference`: the neighbor needs at least a fraction
    /// of its area, and the gap may be at most a fraction of its extent
    /// along the query axis.
    pub fn is_adjacent(
        &self,
        neighbor: &BoundingBox,
        current: &BoundingBox,
        dir: Direction,
        reference: &BoundingBox,
    ) -> bool {
        self.adjacent_within(neighbor, current, dir, reference, self.params.adjacency_gap_ratio)
    }

    fn adjacent_within(
        &self,
        neighbor: &BoundingBox,
        current: &BoundingBox,
        dir: Direction,
        reference: &BoundingBox,
        gap_ratio: f64,
    ) -> bool {
        let cutoff = reference.area() as f64 / self.params.adjacency_area_divisor;
        if (neighbor.area() as f64) < cutoff {
            return false;
        }
        let extent = if dir.is_horizontal() {
            reference.width()
        } else {
            reference.height()
        };
        let gap = f64::from(current.gap_toward(neighbor, dir));
        gap <= f64::from(extent) * gap_ratio
    }

    /// Whether `elem` was recognized, with enough certainty, as a single
    /// operator character.
    pub fn is_operator(&self, elem: ElemId) -> Result<bool> {
        let rec = &self.blob(elem)?.recognition;
        let Some(text) = rec.text.as_deref().map(str::trim) else {
            return Ok(false);
        };
        let mut chars = text.chars();
        let single = match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        };
        Ok(single.is_some_and(|c| self.params.operators.contains(c))
            && rec.certainty > self.params.operator_certainty())
    }

    /// Nearest unclaimed blob lying strictly beyond the `dir` edge of `area`
    /// and overlapping its cross-axis span.
    pub fn nearest_unclaimed_beyond(&self, area: &BoundingBox, dir: Direction) -> Option<ElemId> {
        let beam = if dir.is_horizontal() {
            self.grid.side_search(area.edge(dir), area.bottom, area.top, dir)
        } else {
            self.grid.vertical_search(area.left, area.right, area.edge(dir), dir)
        };
        beam.filter(|hit| hit.distance > 0)
            .map(|hit| hit.id)
            .find(|&id| self.grid.get(id).is_some_and(|b| !b.is_claimed()))
    }
}
