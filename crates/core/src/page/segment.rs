//! Segments and the page-scoped arena that owns them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegError};
use crate::grid::ElemId;
use crate::utils::{BoundingBox, get_bound};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub usize);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seg{}", self.0)
    }
}

/// Where a math region sits relative to the surrounding text.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    /// Inline with a line of ordinary text.
    Embedded,
    /// On its own line.
    Displayed,
}

impl SegmentKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            SegmentKind::Embedded => "embedded",
            SegmentKind::Displayed => "displayed",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "embedded" => Ok(SegmentKind::Embedded),
            "displayed" => Ok(SegmentKind::Displayed),
            other => Err(format!("unknown segment type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    /// Union of the member boxes; only ever grows.
    pub bbox: BoundingBox,
    pub kind: SegmentKind,
    /// Blob the segment was grown from.
    pub seed: ElemId,
    /// Claimed blobs in claim order.
    pub members: Vec<ElemId>,
}

/// Segment storage for one page. Ids are slot indices and are not reused
/// after a segment is deleted.
#[derive(Debug, Clone, Default)]
pub struct SegmentArena {
    slots: Vec<Option<Segment>>,
}

impl SegmentArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a segment seeded by `seed`, which becomes its first member.
    pub fn create(&mut self, seed: ElemId, bbox: BoundingBox, kind: SegmentKind) -> SegmentId {
        let id = SegmentId(self.slots.len());
        self.slots.push(Some(Segment {
            id,
            bbox,
            kind,
            seed,
            members: vec![seed],
        }));
        id
    }

    pub fn get(&self, id: SegmentId) -> Result<&Segment> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(SegError::UnknownSegment(id.0))
    }

    fn get_mut(&mut self, id: SegmentId) -> Result<&mut Segment> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(SegError::UnknownSegment(id.0))
    }

    pub fn bbox(&self, id: SegmentId) -> Result<BoundingBox> {
        self.get(id).map(|s| s.bbox)
    }

    /// Records a new member and grows the segment box over it.
    pub(crate) fn add_member(
        &mut self,
        id: SegmentId,
        elem: ElemId,
        bbox: BoundingBox,
    ) -> Result<()> {
        let seg = self.get_mut(id)?;
        seg.members.push(elem);
        seg.bbox.absorb(&bbox);
        Ok(())
    }

    /// Deletes `from`, handing its members and box to `into`. Returns the
    /// moved members.
    pub(crate) fn absorb(&mut self, into: SegmentId, from: SegmentId) -> Result<Vec<ElemId>> {
        if into == from {
            return Ok(Vec::new());
        }
        // Check `into` first so a bad id leaves `from` untouched.
        self.get(into)?;
        let removed = self
            .slots
            .get_mut(from.0)
            .and_then(Option::take)
            .ok_or(SegError::UnknownSegment(from.0))?;
        let target = self.get_mut(into)?;
        target.bbox.absorb(&removed.bbox);
        target.members.extend_from_slice(&removed.members);
        Ok(removed.members)
    }

    /// Live segments in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.slots.iter().flatten()
    }

    pub fn ids(&self) -> Vec<SegmentId> {
        self.iter().map(|s| s.id).collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of segments ever created on this page.
    pub fn created(&self) -> usize {
        self.slots.len()
    }

    /// Union of the member boxes of `id`, looked up through `bbox_of`.
    pub fn union_of_members(
        &self,
        id: SegmentId,
        bbox_of: impl Fn(ElemId) -> Option<BoundingBox>,
    ) -> Result<Option<BoundingBox>> {
        let seg = self.get(id)?;
        let boxes = seg
            .members
            .iter()
            .map(|&m| bbox_of(m).ok_or(SegError::NotInGrid(m.0)))
            .collect::<Result<Vec<_>>>()?;
        Ok(get_bound(boxes))
    }
}
