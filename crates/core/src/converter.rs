//! Rect-list output.
//!
//! One line per segment:
//!
//! ```text
//! [<page-name> ]<type> <left> <top> <right> <bottom>
//! ```
//!
//! Segments are computed with a bottom-left origin. Image tooling reads
//! rect files with a top-left origin, so the converter can flip y using the
//! page height; which space a file uses has to be agreed with its reader.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use crate::analysis::PageSegmentation;
use crate::error::{Result, SegError};
use crate::page::SegmentKind;
use crate::utils::BoundingBox;

/// Coordinate convention of a rect list.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum CoordinateSpace {
    /// y grows upward from the bottom edge; boxes are written unchanged.
    #[default]
    BottomLeft,
    /// y grows downward from the top edge.
    TopLeft,
}

impl CoordinateSpace {
    /// Re-expresses a bottom-left box in this space, as
    /// `(left, top, right, bottom)` in reading order.
    pub fn project(self, bbox: &BoundingBox, page_height: i32) -> (i32, i32, i32, i32) {
        match self {
            CoordinateSpace::BottomLeft => (bbox.left, bbox.top, bbox.right, bbox.bottom),
            CoordinateSpace::TopLeft => (
                bbox.left,
                page_height - bbox.top,
                bbox.right,
                page_height - bbox.bottom,
            ),
        }
    }

    /// Inverse of [`project`](Self::project).
    pub fn unproject(
        self,
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
        page_height: i32,
    ) -> BoundingBox {
        match self {
            CoordinateSpace::BottomLeft => BoundingBox::new(left, bottom, right, top),
            CoordinateSpace::TopLeft => {
                BoundingBox::new(left, page_height - bottom, right, page_height - top)
            }
        }
    }
}

impl fmt::Display for CoordinateSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CoordinateSpace::BottomLeft => "bottom-left",
            CoordinateSpace::TopLeft => "top-left",
        })
    }
}

impl FromStr for CoordinateSpace {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "bottom-left" => Ok(CoordinateSpace::BottomLeft),
            "top-left" => Ok(CoordinateSpace::TopLeft),
            other => Err(format!("unknown coordinate space '{other}'")),
        }
    }
}

/// Writes segmentation results as rect lines.
pub struct RectConverter<'a, W: Write> {
    outfp: &'a mut W,
    space: CoordinateSpace,
    /// Prefix every line with the page name.
    show_page_name: bool,
}

impl<'a, W: Write> RectConverter<'a, W> {
    pub fn new(outfp: &'a mut W, space: CoordinateSpace, show_page_name: bool) -> Self {
        Self {
            outfp,
            space,
            show_page_name,
        }
    }

    /// Writes one line per segment of `page`.
    pub fn receive_page(&mut self, page: &PageSegmentation) -> Result<()> {
        let name = self.show_page_name.then_some(page.name.as_str());
        for seg in &page.segments {
            let line = format_rect_line(name, seg.kind, &seg.bbox, self.space, page.height);
            writeln!(self.outfp, "{line}")?;
        }
        Ok(())
    }
}

/// Formats one rect line for a bottom-left box.
pub fn format_rect_line(
    page_name: Option<&str>,
    kind: SegmentKind,
    bbox: &BoundingBox,
    space: CoordinateSpace,
    page_height: i32,
) -> String {
    let (left, top, right, bottom) = space.project(bbox, page_height);
    match page_name.filter(|n| !n.is_empty()) {
        Some(name) => format!("{name} {kind} {left} {top} {right} {bottom}"),
        None => format!("{kind} {left} {top} {right} {bottom}"),
    }
}

/// A parsed rect line, coordinates as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RectLine {
    pub page: Option<String>,
    pub kind: SegmentKind,
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl RectLine {
    pub fn to_bottom_left(&self, space: CoordinateSpace, page_height: i32) -> BoundingBox {
        space.unproject(self.left, self.top, self.right, self.bottom, page_height)
    }
}

/// Parses one rect line; `line_no` is only used in error messages.
pub fn parse_rect_line(line: &str, line_no: usize) -> Result<RectLine> {
    let syntax = |msg: String| SegError::RectSyntax { line: line_no, msg };
    let fields: Vec<&str> = line.split_whitespace().collect();
    let (page, rest) = match fields.len() {
        5 => (None, &fields[..]),
        6 => (Some(fields[0].to_string()), &fields[1..]),
        n => return Err(syntax(format!("expected 5 or 6 fields, found {n}"))),
    };
    let kind: SegmentKind = rest[0].parse().map_err(syntax)?;
    let mut coords = [0i32; 4];
    for (slot, field) in coords.iter_mut().zip(&rest[1..]) {
        *slot = field
            .parse()
            .map_err(|_| syntax(format!("'{field}' is not an integer coordinate")))?;
    }
    let [left, top, right, bottom] = coords;
    Ok(RectLine {
        page,
        kind,
        left,
        top,
        right,
        bottom,
    })
}

/// Parses a whole rect list, skipping blank lines.
pub fn parse_rect_list(text: &str) -> Result<Vec<RectLine>> {
    text.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| parse_rect_line(l, i + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_left_flip_round_trips() {
        let bbox = BoundingBox::new(10, 20, 30, 60);
        let line =
            format_rect_line(None, SegmentKind::Displayed, &bbox, CoordinateSpace::TopLeft, 100);
        assert_eq!(line, "displayed 10 40 30 80");
        let parsed = parse_rect_line(&line, 1).unwrap();
        assert_eq!(parsed.to_bottom_left(CoordinateSpace::TopLeft, 100), bbox);
    }

    #[test]
    fn test_page_name_prefix() {
        let bbox = BoundingBox::new(1, 2, 3, 4);
        let line = format_rect_line(
            Some("scan.png"),
            SegmentKind::Embedded,
            &bbox,
            CoordinateSpace::BottomLeft,
            0,
        );
        assert_eq!(line, "scan.png embedded 1 4 3 2");
        assert_eq!(parse_rect_line(&line, 1).unwrap().page.as_deref(), Some("scan.png"));
    }

    #[test]
    fn test_parse_errors_name_the_line() {
        let err = parse_rect_list("displayed 1 2 3 4\n\nlabel 1 2 3 4\n").unwrap_err();
        assert!(matches!(err, SegError::RectSyntax { line: 3, .. }));
        assert!(parse_rect_line("displayed 1 2 x 4", 1).is_err());
        assert!(parse_rect_line("displayed 1 2 3", 1).is_err());
    }
}
