//! Passes that run around segment growth.
//!
//! Before growth, math labels that are most likely classifier noise are
//! dropped: stop words, lone math-looking letters inside ordinary words,
//! and the page header row. After growth, segments nested inside another
//! segment are folded into it.

use std::cmp::Reverse;

use itertools::Itertools;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::grid::ElemId;
use crate::page::PageGrid;
use crate::params::SegParams;

/// Math labels removed by the pre-pass, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PrepassReport {
    pub stop_words: usize,
    pub sparse_words: usize,
    pub header_row: usize,
}

impl PrepassReport {
    pub fn total(&self) -> usize {
        self.stop_words + self.sparse_words + self.header_row
    }
}

/// Runs every pre-pass filter enabled in `params`.
pub fn run_prepass(page: &mut PageGrid, params: &SegParams) -> Result<PrepassReport> {
    let mut report = suppress_sparse_words(page, params)?;
    if params.suppress_header_row {
        report.header_row = suppress_header_row(page)?;
    }
    debug!(
        page = %page.name,
        stop_words = report.stop_words,
        sparse_words = report.sparse_words,
        header_row = report.header_row,
        "pre-pass suppressed math labels"
    );
    Ok(report)
}

/// Drops math labels inside confidently recognized ordinary words.
///
/// A math blob in a stop word loses its label outright. Otherwise, when the
/// share of math blobs in its word is below `sparseness_threshold`, every
/// blob of the word loses it.
pub fn suppress_sparse_words(page: &mut PageGrid, params: &SegParams) -> Result<PrepassReport> {
    let words = page
        .blobs
        .iter()
        .filter_map(|(id, b)| b.recognition.word.map(|w| (w, id)))
        .into_group_map();
    let mut report = PrepassReport::default();

    let ids: Vec<ElemId> = page.blobs.full_scan().collect();
    for id in ids {
        let blob = page.blob(id)?;
        let rec = &blob.recognition;
        if !blob.is_math || !rec.is_confident_prose(params.certainty_threshold) {
            continue;
        }
        if rec.is_stop_word {
            page.blob_mut(id)?.is_math = false;
            report.stop_words += 1;
            continue;
        }
        let Some(siblings) = rec.word.and_then(|w| words.get(&w)) else {
            continue;
        };
        let math = siblings
            .iter()
            .map(|&s| page.blob(s).map(|b| b.is_math))
            .process_results(|flags| flags.filter(|&m| m).count())?;
        let ratio = math as f64 / siblings.len() as f64;
        if ratio < params.sparseness_threshold {
            for &s in siblings {
                let sibling = page.blob_mut(s)?;
                if sibling.is_math {
                    sibling.is_math = false;
                    report.sparse_words += 1;
                }
            }
        }
    }
    Ok(report)
}

/// Drops every math label on the topmost text row. Returns how many labels
/// were dropped.
pub fn suppress_header_row(page: &mut PageGrid) -> Result<usize> {
    let top_row = page
        .blobs
        .iter()
        .filter_map(|(_, b)| b.recognition.row.map(|r| (r, b.bbox.top)))
        .into_grouping_map()
        .max()
        .into_iter()
        .max_by_key(|&(row, top)| (top, Reverse(row)))
        .map(|(row, _)| row);
    let Some(top_row) = top_row else {
        return Ok(0);
    };

    let header: Vec<ElemId> = page
        .blobs
        .iter()
        .filter(|(_, b)| b.is_math && b.recognition.row == Some(top_row))
        .map(|(id, _)| id)
        .collect();
    for &id in &header {
        page.blob_mut(id)?.is_math = false;
    }
    Ok(header.len())
}

/// Folds every segment whose box is almost contained in another segment's
/// box into that segment, until no such pair is left. Segments with equal
/// boxes collapse into the one with the lower id.
///
/// Returns the number of segments removed.
pub fn merge_contained_segments(page: &mut PageGrid, tolerance: i32) -> Result<usize> {
    let mut removed = 0;
    loop {
        let mut changed = false;
        for outer in page.segments.ids() {
            // Already folded into an earlier segment during this sweep.
            if page.segments.get(outer).is_err() {
                continue;
            }
            for inner in page.segments.ids() {
                if inner == outer || page.segments.get(inner).is_err() {
                    continue;
                }
                let outer_box = page.segment_box(outer)?;
                let inner_box = page.segment_box(inner)?;
                if outer_box.almost_contains(&inner_box, tolerance) {
                    let moved = page.merge_segments(outer, inner)?;
                    debug!(into = %outer, from = %inner, moved, "folded contained segment");
                    removed += 1;
                    changed = true;
                }
            }
        }
        if !changed {
            return Ok(removed);
        }
    }
}
