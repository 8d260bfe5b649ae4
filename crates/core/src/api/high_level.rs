//! Page-level entry points.
//!
//! Pages share no state, so batches fan out over a rayon pool with one
//! [`Segmenter`] per worker; each page builds and owns its own grid.

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::warn;

use crate::analysis::{PageSegmentation, SegmentationStats, Segmenter, detection_segments};
use crate::error::{Result, SegError};
use crate::page::{PageGrid, PageInput};
use crate::params::SegParams;

pub(crate) fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Options for batch segmentation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SegmentOptions {
    pub params: SegParams,

    /// Worker threads. None uses the available parallelism.
    pub threads: Option<usize>,

    /// Report every math-labelled blob as its own segment instead of
    /// grouping them.
    pub detections_only: bool,
}

/// Segments a single page.
///
/// # Example
/// ```ignore
/// use mathseg_core::api::segment_page;
/// use mathseg_core::page::load_pages;
///
/// let pages = load_pages(std::fs::File::open("page.json")?)?;
/// let result = segment_page(&pages[0], &Default::default())?;
/// for seg in &result.segments {
///     println!("{} {}", seg.kind, seg.bbox);
/// }
/// ```
pub fn segment_page(input: &PageInput, params: &SegParams) -> Result<PageSegmentation> {
    params.validate()?;
    let mut page = PageGrid::from_input(input, params)?;
    Segmenter::new(params.clone()).run(&mut page)
}

/// Raw classifier output for a page, one segment per math-labelled blob.
pub fn detect_page(input: &PageInput, params: &SegParams) -> Result<PageSegmentation> {
    params.validate()?;
    let page = PageGrid::from_input(input, params)?;
    let segments = detection_segments(&page);
    Ok(PageSegmentation {
        name: page.name.clone(),
        width: page.width,
        height: page.height,
        stats: SegmentationStats {
            blobs: page.blobs.len(),
            seeds: segments.len(),
            segments_grown: segments.len(),
            ..SegmentationStats::default()
        },
        segments,
    })
}

/// Segments many pages in parallel.
///
/// Results come back in input order. A page that fails (for example on a
/// malformed box) yields an `Err` in its own slot and does not affect the
/// others; the outer `Result` only reports setup failures.
pub fn segment_pages(
    inputs: &[PageInput],
    options: &SegmentOptions,
) -> Result<Vec<Result<PageSegmentation>>> {
    options.params.validate()?;
    let pool = ThreadPoolBuilder::new()
        .num_threads(options.threads.unwrap_or_else(default_thread_count))
        .build()
        .map_err(|e| SegError::ThreadPool(e.to_string()))?;

    let mut results: Vec<(usize, Result<PageSegmentation>)> = pool.install(|| {
        inputs
            .par_iter()
            .enumerate()
            .map_init(
                || Segmenter::new(options.params.clone()),
                |segmenter, (idx, input)| (idx, process_page(segmenter, input, options)),
            )
            .collect()
    });

    results.sort_by_key(|(idx, _)| *idx);
    Ok(results.into_iter().map(|(_, r)| r).collect())
}

fn process_page(
    segmenter: &Segmenter,
    input: &PageInput,
    options: &SegmentOptions,
) -> Result<PageSegmentation> {
    let result = if options.detections_only {
        detect_page(input, segmenter.params())
    } else {
        PageGrid::from_input(input, segmenter.params())
            .and_then(|mut page| segmenter.run(&mut page))
    };
    if let Err(e) = &result {
        warn!(page = %input.name, error = %e, "page failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::BlobInput;
    use crate::utils::BoundingBox;

    fn page(name: &str, boxes: &[BoundingBox]) -> PageInput {
        PageInput::new(
            name,
            500,
            500,
            boxes.iter().map(|b| BlobInput::new(*b, true)).collect(),
        )
    }

    #[test]
    fn test_segment_pages_preserves_order_and_isolates_errors() {
        let good = page("a", &[BoundingBox::new(10, 10, 20, 20)]);
        let bad = page("b", &[BoundingBox::new(30, 10, 20, 20)]);
        let other = page(
            "c",
            &[BoundingBox::new(10, 10, 20, 20), BoundingBox::new(300, 300, 320, 320)],
        );
        let options = SegmentOptions {
            threads: Some(2),
            ..SegmentOptions::default()
        };
        let results = segment_pages(&[good, bad, other], &options).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().name, "a");
        assert!(matches!(results[1], Err(SegError::MalformedBox { index: 0, .. })));
        assert_eq!(results[2].as_ref().unwrap().segments.len(), 2);
    }

    #[test]
    fn test_detections_only_skips_grouping() {
        let touching = page(
            "d",
            &[BoundingBox::new(10, 10, 30, 50), BoundingBox::new(32, 10, 52, 50)],
        );
        let grouped = segment_page(&touching, &SegParams::default()).unwrap();
        assert_eq!(grouped.segments.len(), 1);
        let options = SegmentOptions {
            detections_only: true,
            ..SegmentOptions::default()
        };
        let raw = segment_pages(std::slice::from_ref(&touching), &options).unwrap();
        assert_eq!(raw[0].as_ref().unwrap().segments.len(), 2);
    }

    #[test]
    fn test_invalid_params_rejected_up_front() {
        let options = SegmentOptions {
            params: SegParams {
                grid_cell_size: 0,
                ..SegParams::default()
            },
            ..SegmentOptions::default()
        };
        assert!(matches!(
            segment_pages(&[], &options),
            Err(SegError::InvalidParams { .. })
        ));
    }
}
