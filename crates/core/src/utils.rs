//! Geometric primitives shared by the grid, the relation queries and the
//! segmentation passes.
//!
//! Boxes live in page-image pixel coordinates with the origin at the
//! bottom-left corner and y growing upward, so `bottom <= top` for every
//! well-formed box. Conversion to the top-left image convention happens only
//! at the output boundary (see [`crate::converter`]).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest coordinate magnitude a page or blob may use.
pub const MAX_COORD: i32 = 1 << 28;

/// An axis-aligned rectangle with inclusive integer edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
    pub top: i32,
}

impl BoundingBox {
    pub const fn new(left: i32, bottom: i32, right: i32, top: i32) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// True when `left <= right` and `bottom <= top`.
    pub const fn is_well_formed(&self) -> bool {
        self.left <= self.right && self.bottom <= self.top
    }

    /// True when every edge lies within `±MAX_COORD`.
    pub const fn is_in_range(&self) -> bool {
        let max = MAX_COORD;
        -max <= self.left
            && self.left <= max
            && -max <= self.bottom
            && self.bottom <= max
            && -max <= self.right
            && self.right <= max
            && -max <= self.top
            && self.top <= max
    }

    /// Saturates at `i32::MAX` for boxes wider than the `i32` range.
    pub const fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub const fn height(&self) -> i32 {
        self.top.saturating_sub(self.bottom)
    }

    pub const fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    pub const fn center_x(&self) -> i32 {
        self.left + self.width() / 2
    }

    pub const fn center_y(&self) -> i32 {
        self.bottom + self.height() / 2
    }

    /// Larger of width and height.
    pub fn max_dimension(&self) -> i32 {
        self.width().max(self.height())
    }

    /// Returns true if the two boxes share at least one point (edges count).
    pub const fn intersects(&self, other: &BoundingBox) -> bool {
        self.left <= other.right
            && other.left <= self.right
            && self.bottom <= other.top
            && other.bottom <= self.top
    }

    pub const fn contains(&self, other: &BoundingBox) -> bool {
        self.left <= other.left
            && self.bottom <= other.bottom
            && self.right >= other.right
            && self.top >= other.top
    }

    /// Containment after growing `self` by `tolerance` on every side.
    pub const fn almost_contains(&self, other: &BoundingBox, tolerance: i32) -> bool {
        self.expanded(tolerance).contains(other)
    }

    pub const fn expanded(&self, by: i32) -> Self {
        Self::new(
            self.left - by,
            self.bottom - by,
            self.right + by,
            self.top + by,
        )
    }

    pub fn union(&self, other: &BoundingBox) -> Self {
        Self::new(
            self.left.min(other.left),
            self.bottom.min(other.bottom),
            self.right.max(other.right),
            self.top.max(other.top),
        )
    }

    /// Grows `self` in place so that it covers `other`.
    pub fn absorb(&mut self, other: &BoundingBox) {
        *self = self.union(other);
    }

    /// Signed gap from `self` to `other` moving in `dir`.
    ///
    /// Negative values mean the boxes overlap along that axis.
    pub const fn gap_toward(&self, other: &BoundingBox, dir: Direction) -> i32 {
        match dir {
            Direction::Right => other.left - self.right,
            Direction::Left => self.left - other.right,
            Direction::Up => other.bottom - self.top,
            Direction::Down => self.bottom - other.top,
        }
    }

    /// The edge coordinate facing `dir`.
    pub const fn edge(&self, dir: Direction) -> i32 {
        match dir {
            Direction::Right => self.right,
            Direction::Left => self.left,
            Direction::Up => self.top,
            Direction::Down => self.bottom,
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{},{},{}]",
            self.left, self.bottom, self.right, self.top
        )
    }
}

/// One of the four axis directions a neighbor can lie in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    pub const fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }

    /// True when moving in this direction increases the coordinate.
    pub const fn is_ascending(self) -> bool {
        matches!(self, Direction::Right | Direction::Up)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for objects that have a bounding box.
pub trait HasBBox {
    fn bbox(&self) -> BoundingBox;
}

impl HasBBox for BoundingBox {
    fn bbox(&self) -> BoundingBox {
        *self
    }
}

/// Computes a minimal box that covers all the given boxes.
pub fn get_bound<I: IntoIterator<Item = BoundingBox>>(boxes: I) -> Option<BoundingBox> {
    boxes.into_iter().reduce(|acc, b| acc.union(&b))
}
