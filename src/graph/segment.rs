//! Segments, the ancestry lines between a child and one of its parents.

use crate::graph::revision::RevisionIdx;

/// Index of a [`Segment`] in the node store arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentIdx(pub(crate) usize);

impl SegmentIdx {
    /// The raw arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One line of ancestry, from a child revision down to one of its parents.
///
/// A segment starts in the row of its child and ends in the row of its parent; in every row
/// in between it passes through one lane. Its identity never changes once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// The revision the line starts at
    pub child: RevisionIdx,
    /// The revision the line ends at
    pub parent: RevisionIdx,
}
