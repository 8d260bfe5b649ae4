//! Query shapes of the spatial grid, on boxes that straddle cell borders.

use mathseg_core::grid::SpatialGrid;
use mathseg_core::utils::MAX_COORD;
use mathseg_core::{BoundingBox, Direction, ElemId};

fn grid(boxes: &[BoundingBox], cell: i32) -> SpatialGrid<BoundingBox> {
    let mut grid = SpatialGrid::new(BoundingBox::new(0, 0, 500, 500), cell);
    for b in boxes {
        grid.insert(*b);
    }
    grid
}

fn ids(hits: &[usize]) -> Vec<ElemId> {
    hits.iter().copied().map(ElemId).collect()
}

#[test]
fn test_rect_search_matches_brute_force_for_any_cell_size() {
    let boxes = [
        BoundingBox::new(0, 0, 10, 10),
        BoundingBox::new(30, 30, 95, 60),
        BoundingBox::new(64, 64, 64, 64),
        BoundingBox::new(100, 0, 140, 300),
        BoundingBox::new(250, 250, 260, 260),
        BoundingBox::new(490, 490, 500, 500),
    ];
    let areas = [
        BoundingBox::new(0, 0, 500, 500),
        BoundingBox::new(60, 60, 70, 70),
        BoundingBox::new(95, 60, 100, 60),
        BoundingBox::new(200, 200, 240, 240),
        BoundingBox::new(-50, -50, 0, 0),
    ];
    for cell in [3, 7, 16, 64, 1000] {
        let g = grid(&boxes, cell);
        for area in areas {
            let expected: Vec<ElemId> = boxes
                .iter()
                .enumerate()
                .filter(|(_, b)| b.intersects(&area))
                .map(|(i, _)| ElemId(i))
                .collect();
            assert_eq!(g.rect_search(area), expected, "cell {cell}, area {area}");
        }
    }
}

#[test]
fn test_side_search_orders_by_distance_across_cells() {
    let g = grid(
        &[
            BoundingBox::new(300, 100, 310, 110),
            BoundingBox::new(120, 100, 130, 110),
            BoundingBox::new(200, 105, 210, 140),
            BoundingBox::new(150, 200, 160, 210),
        ],
        32,
    );
    let hits: Vec<(ElemId, i32)> = g
        .side_search(100, 100, 110, Direction::Right)
        .map(|h| (h.id, h.distance))
        .collect();
    assert_eq!(hits, vec![(ElemId(1), 20), (ElemId(2), 100), (ElemId(0), 200)]);

    let left: Vec<ElemId> = g.side_search(305, 100, 110, Direction::Left).map(|h| h.id).collect();
    assert_eq!(left, ids(&[0, 2, 1]));
}

#[test]
fn test_vertical_search_both_ways() {
    let g = grid(
        &[
            BoundingBox::new(100, 300, 120, 310),
            BoundingBox::new(105, 150, 115, 160),
            BoundingBox::new(300, 150, 310, 160),
            BoundingBox::new(110, 20, 130, 30),
        ],
        16,
    );
    let up: Vec<ElemId> = g.vertical_search(100, 120, 100, Direction::Up).map(|h| h.id).collect();
    assert_eq!(up, ids(&[1, 0]));
    let down: Vec<ElemId> =
        g.vertical_search(100, 120, 100, Direction::Down).map(|h| h.id).collect();
    assert_eq!(down, ids(&[3]));
}

#[test]
fn test_beam_stops_early_without_losing_order() {
    let boxes: Vec<BoundingBox> = (0..40)
        .rev()
        .map(|i| BoundingBox::new(i * 12, 0, i * 12 + 10, 10))
        .collect();
    let g = grid(&boxes, 16);
    let first: Vec<i32> = g
        .side_search(0, 0, 10, Direction::Right)
        .take(3)
        .map(|h| h.distance)
        .collect();
    assert_eq!(first, vec![0, 12, 24]);
}

#[test]
fn test_huge_extent_gets_coarser_cells() {
    let mut g = SpatialGrid::new(BoundingBox::new(-2_000_000_000, 0, 2_000_000_000, MAX_COORD), 1);
    let (cols, rows) = g.dimensions();
    assert!(cols * rows <= 1 << 20, "{cols}x{rows} buckets");
    assert!(g.cell_size() > 1);

    g.insert(BoundingBox::new(0, 0, 10, 10));
    g.insert(BoundingBox::new(1_000_000, 5_000, 1_000_010, 5_010));
    assert_eq!(g.rect_search(BoundingBox::new(999_000, 4_000, 1_001_000, 6_000)), ids(&[1]));
    let right: Vec<(ElemId, i32)> = g
        .side_search(10, 5_000, 5_010, Direction::Right)
        .map(|h| (h.id, h.distance))
        .collect();
    assert_eq!(right, vec![(ElemId(1), 999_990)]);
}

#[test]
fn test_removed_elements_vanish_from_queries() {
    let mut g = grid(&[BoundingBox::new(10, 10, 20, 20), BoundingBox::new(40, 10, 50, 20)], 16);
    g.remove(ElemId(0)).unwrap();
    assert_eq!(g.rect_search(BoundingBox::new(0, 0, 100, 100)), ids(&[1]));
    assert_eq!(g.side_search(0, 10, 20, Direction::Right).count(), 1);
    assert!(g.remove(ElemId(0)).is_err());
}
