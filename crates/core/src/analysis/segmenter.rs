//! Region growing from math-classified seed blobs.
//!
//! Every unclaimed math blob seeds a segment. From each member the grower
//! collects merge candidates (covered and stacked neighbors, blobs
//! intersecting the segment box, and an operator/operand look-ahead past
//! the segment's left and right edges), claims the ones still free, and
//! re-examines the segment from the grown box. Growth is driven by an
//! explicit worklist whose depth is capped per seed.

use std::cmp::Reverse;

use serde::Serialize;
use tracing::{debug, trace, warn};

use super::cleanup::{self, PrepassReport};
use super::relations::{CoverMode, RelationQueries};
use crate::error::Result;
use crate::grid::ElemId;
use crate::page::{PageGrid, PendingMerges, Segment, SegmentId, SegmentKind};
use crate::params::SegParams;
use crate::utils::{BoundingBox, Direction};

/// Counters describing one page run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SegmentationStats {
    pub blobs: usize,
    pub prepass: PrepassReport,
    /// Seeds that opened a segment.
    pub seeds: usize,
    /// Blobs claimed by growth, seeds excluded.
    pub merges: usize,
    /// Segments alive before the containment pass.
    pub segments_grown: usize,
    /// Segments folded away by the containment pass.
    pub segments_folded: usize,
    /// Seeds whose growth hit the depth limit.
    pub depth_limited: Vec<ElemId>,
}

/// Result of segmenting one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSegmentation {
    pub name: String,
    pub width: i32,
    pub height: i32,
    /// Surviving segments in ascending id order.
    pub segments: Vec<Segment>,
    pub stats: SegmentationStats,
}

/// How the growth of one seed ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrowthOutcome {
    pub merged: usize,
    pub depth_limited: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    params: SegParams,
}

impl Segmenter {
    pub fn new(params: SegParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SegParams {
        &self.params
    }

    /// Segments a page: pre-pass, growth from every unclaimed math blob in
    /// ascending id order, then the containment pass.
    pub fn run(&self, page: &mut PageGrid) -> Result<PageSegmentation> {
        let mut stats = SegmentationStats {
            blobs: page.blobs.len(),
            prepass: cleanup::run_prepass(page, &self.params)?,
            ..SegmentationStats::default()
        };

        let ids: Vec<ElemId> = page.blobs.full_scan().collect();
        for id in ids {
            let blob = page.blob(id)?;
            if !blob.is_math || blob.is_claimed() {
                continue;
            }
            let segment = page.open_segment(id)?;
            stats.seeds += 1;
            let outcome = self.grow_segment(page, id, segment)?;
            stats.merges += outcome.merged;
            if outcome.depth_limited {
                stats.depth_limited.push(id);
            }
        }

        stats.segments_grown = page.segments.len();
        stats.segments_folded =
            cleanup::merge_contained_segments(page, self.params.containment_tolerance)?;

        let segments: Vec<Segment> = page.segments.iter().cloned().collect();
        debug!(
            page = %page.name,
            blobs = stats.blobs,
            seeds = stats.seeds,
            merges = stats.merges,
            segments = segments.len(),
            folded = stats.segments_folded,
            "segmented page"
        );
        Ok(PageSegmentation {
            name: page.name.clone(),
            width: page.width,
            height: page.height,
            segments,
            stats,
        })
    }

    /// Grows `segment` outward from `seed`.
    ///
    /// Whenever a decision claims new blobs, the deciding blob is queued
    /// again (its segment box grew) along with every blob it claimed, one
    /// level deeper. Once an entry deeper than `max_merge_depth` comes up,
    /// the remaining work for this seed is dropped and the segment is kept
    /// as grown so far.
    pub fn grow_segment(
        &self,
        page: &mut PageGrid,
        seed: ElemId,
        segment: SegmentId,
    ) -> Result<GrowthOutcome> {
        let mut outcome = GrowthOutcome::default();
        let mut work: Vec<(ElemId, usize)> = vec![(seed, 0)];
        while let Some((elem, depth)) = work.pop() {
            if depth > self.params.max_merge_depth {
                warn!(
                    seed = seed.0,
                    segment = segment.0,
                    depth,
                    "merge depth limit reached, keeping partial segment"
                );
                outcome.depth_limited = true;
                break;
            }
            let merged = self.decide_and_merge(page, elem, segment)?;
            if merged.is_empty() {
                continue;
            }
            outcome.merged += merged.len();
            work.extend(merged.into_iter().rev().map(|m| (m, depth + 1)));
            work.push((elem, depth + 1));
        }
        Ok(outcome)
    }

    /// One merge decision made from `elem` on behalf of `segment`. Returns
    /// the blobs it claimed.
    fn decide_and_merge(
        &self,
        page: &mut PageGrid,
        elem: ElemId,
        segment: SegmentId,
    ) -> Result<Vec<ElemId>> {
        let seg_box = page.segment_box(segment)?;
        let area = seg_box.area();
        {
            let blob = page.blob(elem)?;
            // Taken by another seed's growth in the meantime.
            if blob.segment() != Some(segment) {
                return Ok(Vec::new());
            }
            if blob.merge.processed && blob.merge.processed_area == area {
                return Ok(Vec::new());
            }
        }

        let candidates = self.merge_candidates(page, elem, segment, seg_box)?;
        let state = &mut page.blob_mut(elem)?.merge;
        state.processed = true;
        state.processed_area = area;
        state.pending = candidates;

        let labelled: Vec<(&str, ElemId)> = {
            let pending = &page.blob(elem)?.merge.pending;
            Direction::ALL
                .iter()
                .flat_map(|&d| pending.direction(d).iter().map(move |&c| (d.as_str(), c)))
                .chain(pending.intersecting.iter().map(|&c| ("intersecting", c)))
                .collect()
        };
        let mut merged = Vec::new();
        for (relation, candidate) in labelled {
            if page.claim(candidate, segment)? {
                trace!(%segment, from = elem.0, elem = candidate.0, relation, "merged");
                merged.push(candidate);
            }
        }
        Ok(merged)
    }

    /// Unclaimed blobs that should join `segment`, grouped by how they
    /// relate to it.
    pub fn merge_candidates(
        &self,
        page: &PageGrid,
        elem: ElemId,
        segment: SegmentId,
        seg_box: BoundingBox,
    ) -> Result<PendingMerges> {
        let queries = RelationQueries::new(&page.blobs, &self.params);
        let unclaimed = |id: ElemId| page.blobs.get(id).is_some_and(|b| !b.is_claimed());
        let mut pending = PendingMerges::default();

        for dir in Direction::ALL {
            let mut found = queries.covered_from(elem, seg_box, dir, CoverMode::ExcludeNormalText)?;
            if dir.is_horizontal() {
                found.extend(self.look_ahead(page, &queries, segment, seg_box, dir)?);
            } else {
                found.extend(queries.stacked(elem, dir)?);
            }
            let list = pending.direction_mut(dir);
            for id in found {
                if unclaimed(id) && !list.contains(&id) {
                    list.push(id);
                }
            }
        }

        pending.intersecting = page
            .blobs
            .rect_search(seg_box)
            .into_iter()
            .filter(|&id| unclaimed(id))
            .collect();
        Ok(pending)
    }

    /// Operator/operand look-ahead past the `dir` edge of the segment.
    ///
    /// The nearest free blob beyond the edge joins when it is adjacent to
    /// the member forming that edge and one of the two is an operator,
    /// unless it belongs to a confidently recognized ordinary word.
    fn look_ahead(
        &self,
        page: &PageGrid,
        queries: &RelationQueries<'_>,
        segment: SegmentId,
        seg_box: BoundingBox,
        dir: Direction,
    ) -> Result<Option<ElemId>> {
        let Some(neighbor) = queries.nearest_unclaimed_beyond(&seg_box, dir) else {
            return Ok(None);
        };
        let Some(edge) = self.edge_member(page, segment, dir)? else {
            return Ok(None);
        };
        let neighbor_blob = page.blob(neighbor)?;
        let edge_box = page.blob(edge)?.bbox;
        if !queries.is_adjacent(&neighbor_blob.bbox, &edge_box, dir, &edge_box) {
            return Ok(None);
        }
        if neighbor_blob
            .recognition
            .is_confident_prose(self.params.certainty_threshold)
        {
            return Ok(None);
        }
        let accepted = queries.is_operator(edge)? || queries.is_operator(neighbor)?;
        Ok(accepted.then_some(neighbor))
    }

    /// Member whose box forms the segment's `dir` edge; the lowest id wins
    /// ties.
    fn edge_member(
        &self,
        page: &PageGrid,
        segment: SegmentId,
        dir: Direction,
    ) -> Result<Option<ElemId>> {
        let members = &page.segments.get(segment)?.members;
        let mut best: Option<(i32, ElemId)> = None;
        for &m in members {
            let bbox = page.blob(m)?.bbox;
            // Larger key is further out in `dir`.
            let key = if dir.is_ascending() {
                bbox.edge(dir)
            } else {
                -bbox.edge(dir)
            };
            if best.is_none_or(|(k, id)| (key, Reverse(m)) > (k, Reverse(id))) {
                best = Some((key, m));
            }
        }
        Ok(best.map(|(_, m)| m))
    }
}

/// Every math-labelled blob as a segment of its own, without grouping.
///
/// Shows the raw classifier output in the same shape as a grouped result.
pub fn detection_segments(page: &PageGrid) -> Vec<Segment> {
    page.blobs
        .iter()
        .filter(|(_, b)| b.is_math)
        .enumerate()
        .map(|(i, (id, b))| Segment {
            id: SegmentId(i),
            bbox: b.bbox,
            kind: if b.on_normal_row() {
                SegmentKind::Embedded
            } else {
                SegmentKind::Displayed
            },
            seed: id,
            members: vec![id],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{BlobElement, RecognitionContext, WordId};

    fn math(b: BoundingBox) -> BlobElement {
        BlobElement::new(b, true, RecognitionContext::default())
    }

    fn page_of(blobs: Vec<BlobElement>) -> PageGrid {
        let mut page = PageGrid::new("t", 1000, 1000, 32);
        for b in blobs {
            page.insert_blob(b).unwrap();
        }
        page
    }

    fn text_blob(b: BoundingBox, text: &str, is_math: bool) -> BlobElement {
        BlobElement::new(
            b,
            is_math,
            RecognitionContext {
                word: Some(WordId(b.left as usize)),
                text: Some(text.to_string()),
                certainty: -1.0,
                on_normal_row: true,
                ..RecognitionContext::default()
            },
        )
    }

    #[test]
    fn test_operator_pulls_in_operand() {
        // "x = y" on a normal row: coverage is off, only the look-ahead
        // can connect the pieces.
        let mut page = page_of(vec![
            text_blob(BoundingBox::new(100, 100, 120, 130), "x", true),
            text_blob(BoundingBox::new(125, 110, 140, 118), "=", false),
            text_blob(BoundingBox::new(145, 100, 165, 130), "y", false),
        ]);
        let result = Segmenter::default().run(&mut page).unwrap();
        assert_eq!(result.segments.len(), 1);
        let seg = &result.segments[0];
        assert_eq!(seg.kind, SegmentKind::Embedded);
        assert_eq!(seg.bbox, BoundingBox::new(100, 100, 165, 130));
        assert_eq!(seg.members, vec![ElemId(0), ElemId(1), ElemId(2)]);
    }

    #[test]
    fn test_decision_records_its_candidates() {
        let mut page = page_of(vec![
            text_blob(BoundingBox::new(100, 100, 120, 130), "x", true),
            text_blob(BoundingBox::new(125, 110, 140, 118), "=", false),
        ]);
        let segmenter = Segmenter::default();
        let seg = page.open_segment(ElemId(0)).unwrap();

        let merged = segmenter.decide_and_merge(&mut page, ElemId(0), seg).unwrap();
        assert_eq!(merged, vec![ElemId(1)]);
        let state = &page.blob(ElemId(0)).unwrap().merge;
        assert!(state.processed);
        assert_eq!(state.processed_area, 600);
        assert_eq!(state.pending.direction(Direction::Right), &[ElemId(1)]);
        assert_eq!(state.pending.iter().collect::<Vec<_>>(), vec![ElemId(1)]);

        // The segment grew, so the next decision runs again and finds nothing.
        let merged = segmenter.decide_and_merge(&mut page, ElemId(0), seg).unwrap();
        assert!(merged.is_empty());
        let state = &page.blob(ElemId(0)).unwrap().merge;
        assert!(state.pending.is_empty());
        assert_eq!(state.processed_area, 40 * 30);
    }

    #[test]
    fn test_no_operator_no_look_ahead_merge() {
        let mut page = page_of(vec![
            text_blob(BoundingBox::new(100, 100, 120, 130), "x", true),
            text_blob(BoundingBox::new(125, 100, 145, 130), "y", false),
        ]);
        let result = Segmenter::default().run(&mut page).unwrap();
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].members, vec![ElemId(0)]);
    }

    #[test]
    fn test_prose_neighbor_vetoes_look_ahead() {
        let mut prose = text_blob(BoundingBox::new(125, 100, 145, 130), "=", false);
        prose.recognition.is_valid_word = true;
        let x = text_blob(BoundingBox::new(100, 100, 120, 130), "x", true);
        let mut page = page_of(vec![x, prose]);
        let result = Segmenter::default().run(&mut page).unwrap();
        assert_eq!(result.segments[0].members, vec![ElemId(0)]);
    }

    #[test]
    fn test_depth_limit_keeps_partial_segment() {
        // A long row of touching math blobs needs one level per blob.
        let blobs = (0..12)
            .map(|i| math(BoundingBox::new(i * 22, 500, i * 22 + 20, 540)))
            .collect();
        let mut page = page_of(blobs);
        let params = SegParams {
            max_merge_depth: 2,
            ..SegParams::default()
        };
        let result = Segmenter::new(params).run(&mut page).unwrap();
        assert!(result.stats.depth_limited.contains(&ElemId(0)));
        let first = &result.segments[0];
        assert!(first.members.len() < 12);
        assert_eq!(page.union_of_members(first.id).unwrap(), Some(first.bbox));
    }

    #[test]
    fn test_intersecting_blob_is_claimed() {
        let mut page = page_of(vec![
            math(BoundingBox::new(100, 100, 200, 200)),
            BlobElement::new(
                BoundingBox::new(150, 150, 160, 160),
                false,
                RecognitionContext::default(),
            ),
        ]);
        let result = Segmenter::default().run(&mut page).unwrap();
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].members, vec![ElemId(0), ElemId(1)]);
        assert!(page.blob(ElemId(1)).unwrap().is_math);
    }

    #[test]
    fn test_detection_segments_one_per_math_blob() {
        let page = page_of(vec![
            math(BoundingBox::new(0, 0, 10, 10)),
            BlobElement::new(BoundingBox::new(20, 0, 30, 10), false, RecognitionContext::default()),
            math(BoundingBox::new(12, 0, 18, 10)),
        ]);
        let segs = detection_segments(&page);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[1].seed, ElemId(2));
        assert_eq!(segs[1].id, SegmentId(1));
    }
}
