//! Revisions, the nodes of the commit graph.
//!
//! A [`Revision`] lives in the arena of a [`crate::graph::store::NodeStore`] and is addressed
//! by its [`RevisionIdx`]. Parent and child links are index lists kept in both directions, so
//! the graph can be walked either way without reference cycles.
//!
//! All state that changes after creation is atomic or append-only: the score, the flags and
//! the link lists. A consumer thread can therefore read a revision while the producer keeps
//! adding edges and raising scores.

use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};

use bitflags::bitflags;

use crate::graph::{segment::SegmentIdx, ObjectId};

/// Index of a [`Revision`] in the node store arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RevisionIdx(pub(crate) usize);

impl RevisionIdx {
    /// The raw arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

bitflags! {
    /// Per-revision state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RevisionFlags: u8 {
        /// The commit data of this revision has arrived (it is not only a referenced parent)
        const COMPLETED = 0x01;
        /// The revision belongs to the highlighted branch
        const RELATIVE = 0x02;
        /// The revision is the checked out head
        const CHECKED_OUT = 0x04;
    }
}

/// A node representing one commit.
///
/// Created either when the commit arrives from the log, or as a placeholder when it is first
/// referenced as a parent. A placeholder is completed in place when its own data arrives, so
/// links made while it was a placeholder survive.
#[derive(Debug)]
pub struct Revision {
    id: ObjectId,
    score: AtomicI64,
    flags: AtomicU8,
    pub(crate) parents: boxcar::Vec<RevisionIdx>,
    pub(crate) children: boxcar::Vec<RevisionIdx>,
    pub(crate) start_segments: boxcar::Vec<SegmentIdx>,
}

impl Revision {
    pub(crate) fn new(id: ObjectId, score: i64) -> Self {
        Revision {
            id,
            score: AtomicI64::new(score),
            flags: AtomicU8::new(0),
            parents: boxcar::Vec::new(),
            children: boxcar::Vec::new(),
            start_segments: boxcar::Vec::new(),
        }
    }

    /// The commit id.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The current order key. Lower scores are shown first, parents always score higher than
    /// their children once all their data arrived.
    #[must_use]
    pub fn score(&self) -> i64 {
        self.score.load(Ordering::Acquire)
    }

    /// The current flags.
    #[must_use]
    pub fn flags(&self) -> RevisionFlags {
        RevisionFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    /// Whether the commit data arrived.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.flags().contains(RevisionFlags::COMPLETED)
    }

    /// Whether this revision belongs to the highlighted branch.
    #[must_use]
    pub fn is_relative(&self) -> bool {
        self.flags().contains(RevisionFlags::RELATIVE)
    }

    /// Whether this revision is the checked out head.
    #[must_use]
    pub fn is_checked_out(&self) -> bool {
        self.flags().contains(RevisionFlags::CHECKED_OUT)
    }

    /// The parents, in the order their edges were added.
    pub fn parents(&self) -> impl Iterator<Item = RevisionIdx> + '_ {
        self.parents.iter().map(|(_, parent)| *parent)
    }

    /// The children, in the order their edges were added.
    pub fn children(&self) -> impl Iterator<Item = RevisionIdx> + '_ {
        self.children.iter().map(|(_, child)| *child)
    }

    /// The segments starting at this revision, one per parent.
    pub fn start_segments(&self) -> impl Iterator<Item = SegmentIdx> + '_ {
        self.start_segments.iter().map(|(_, segment)| *segment)
    }

    /// Number of parents.
    #[must_use]
    pub fn parent_count(&self) -> usize {
        self.parents.count()
    }

    /// Number of children.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.count()
    }

    /// Whether `parent` is a direct parent.
    #[must_use]
    pub fn has_parent(&self, parent: RevisionIdx) -> bool {
        self.parents().any(|p| p == parent)
    }

    /// Raises the score to at least `minimal`. Returns the previous score if it changed.
    pub(crate) fn raise_score(&self, minimal: i64) -> Option<i64> {
        let previous = self.score.fetch_max(minimal, Ordering::AcqRel);
        (previous < minimal).then_some(previous)
    }

    /// Shifts the score by `delta`. Returns the previous score.
    pub(crate) fn offset_score(&self, delta: i64) -> i64 {
        self.score.fetch_add(delta, Ordering::AcqRel)
    }

    /// Sets `flag`, returning whether it was set already.
    pub(crate) fn set_flag(&self, flag: RevisionFlags) -> bool {
        let previous = self.flags.fetch_or(flag.bits(), Ordering::AcqRel);
        RevisionFlags::from_bits_truncate(previous).contains(flag)
    }

    pub(crate) fn clear_flag(&self, flag: RevisionFlags) {
        self.flags.fetch_and(!flag.bits(), Ordering::AcqRel);
    }
}
