//! Thread-safe storage and scoring of revisions.
//!
//! The [`NodeStore`] owns every [`Revision`] and [`Segment`] of a graph in append-only arenas
//! and maps commit ids to arena indices. It also assigns the scores which define the order of
//! the rows, and keeps those scores topologically consistent while commits stream in out of
//! order.
//!
//! # Scoring
//!
//! Every call to [`NodeStore::add`] bumps a running maximum. A new commit takes that maximum as
//! its score, so it is shown after everything known so far. Parents not seen yet are created
//! as placeholders with the next maximum. Whenever an edge is added, the parent (and
//! transitively its ancestors) is raised above the child. Scores only grow, with the one
//! exception of [`Insertion`], which shifts everything before an insertion point down to open
//! a gap for an artificial row.
//!
//! # Thread Safety
//!
//! - Lock-free arenas for revisions, segments and the completed list (`boxcar::Vec`)
//! - Concurrent hash map for id lookup with insert-if-absent (`DashMap`)
//! - Atomic scores, flags and cache bookkeeping
//!
//! A reader iterating the completed list is never disturbed by a concurrent append. Score
//! changes which may invalidate an already published ordering set a dirty flag and bump a
//! generation counter instead of taking a lock.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use dashmap::DashMap;
use rayon::prelude::*;

use crate::{
    graph::{
        revision::{Revision, RevisionFlags, RevisionIdx},
        segment::{Segment, SegmentIdx},
        ObjectId,
    },
    Error, Result,
};

/// Reserves a gap of scores for an artificial revision.
///
/// All revisions scored below `score` are moved down by `range`, and the inserted revision
/// takes `score - range`. Its unseen parents are placed right behind it, inside the gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    /// The score of the revision the artificial one is shown in front of
    pub score: i64,
    /// Number of scores reserved in front of it
    pub range: i64,
}

/// Result of adding a commit to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Added {
    /// The revision the commit was stored as
    pub index: RevisionIdx,
    /// Whether parent edges were processed (false for an already scored artificial row)
    pub parents_linked: bool,
}

/// Bookkeeping shared between score mutation and the ordering cache.
#[derive(Debug)]
pub(crate) struct OrderTracking {
    /// Highest score included in the last published ordering
    pub ordered_until_score: AtomicI64,
    /// Set when a score included in the last ordering changed
    pub reorder: AtomicBool,
    /// Bumped on every score change of a completed revision
    pub generation: AtomicU64,
}

/// Arena and index of all revisions of a graph.
#[derive(Debug)]
pub struct NodeStore {
    by_id: DashMap<ObjectId, RevisionIdx>,
    revisions: boxcar::Vec<Revision>,
    segments: boxcar::Vec<Segment>,
    /// Completed revisions, in arrival order
    nodes: boxcar::Vec<RevisionIdx>,
    max_score: AtomicI64,
    pub(crate) tracking: OrderTracking,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        NodeStore {
            by_id: DashMap::new(),
            revisions: boxcar::Vec::new(),
            segments: boxcar::Vec::new(),
            nodes: boxcar::Vec::new(),
            max_score: AtomicI64::new(0),
            tracking: OrderTracking {
                ordered_until_score: AtomicI64::new(i64::MIN),
                reorder: AtomicBool::new(true),
                generation: AtomicU64::new(0),
            },
        }
    }

    /// Number of completed revisions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.nodes.count()
    }

    /// Number of revisions including placeholders.
    #[must_use]
    pub fn revision_count(&self) -> usize {
        self.revisions.count()
    }

    /// The arena index of `id`, if known (complete or placeholder).
    #[must_use]
    pub fn index_of(&self, id: &ObjectId) -> Option<RevisionIdx> {
        self.by_id.get(id).map(|entry| *entry)
    }

    /// The revision at `index`.
    ///
    /// # Panics
    /// Indices are only handed out by this store; an index of another store may panic.
    #[must_use]
    pub fn revision(&self, index: RevisionIdx) -> &Revision {
        &self.revisions[index.0]
    }

    /// The segment at `index`.
    ///
    /// # Panics
    /// Indices are only handed out by this store; an index of another store may panic.
    #[must_use]
    pub fn segment(&self, index: SegmentIdx) -> Segment {
        self.segments[index.0]
    }

    /// Iterates over all completed revisions in arrival order.
    pub fn nodes(&self) -> impl Iterator<Item = RevisionIdx> + '_ {
        self.nodes.iter().map(|(_, index)| *index)
    }

    /// Iterates over all revisions including placeholders.
    pub fn revisions(&self) -> impl Iterator<Item = (RevisionIdx, &Revision)> + '_ {
        self.revisions
            .iter()
            .map(|(index, revision)| (RevisionIdx(index), revision))
    }

    /// The running maximum score.
    #[must_use]
    pub fn max_score(&self) -> i64 {
        self.max_score.load(Ordering::Acquire)
    }

    /// Adds the data of one commit, linking it to its parents.
    ///
    /// Malformed parent lists are tolerated: duplicate parent ids and a commit listing itself
    /// as parent are skipped.
    pub(crate) fn add(
        &self,
        id: ObjectId,
        parents: &[ObjectId],
        insertion: Option<Insertion>,
        only_first_parent: bool,
    ) -> Added {
        // Preliminary score: this commit is ordered after everything seen so far
        let max_score = self.max_score.fetch_add(1, Ordering::AcqRel) + 1;

        let mut parents_linked = true;
        let index = match self.index_of(&id) {
            None => {
                let score = match insertion {
                    Some(insertion) => {
                        self.shift_scores_below(insertion.score, insertion.range);
                        let score = insertion.score - insertion.range;
                        // Lands inside the published ordering even if nothing was shifted
                        self.order_invalidated(score);
                        score
                    }
                    None => max_score,
                };
                self.insert_if_absent(id, score)
            }
            Some(index) => {
                if insertion.is_none() {
                    // Seen as a parent before, move it behind everything referencing it
                    let raised = self.ensure_score_above(index, max_score);
                    self.max_score.fetch_max(raised, Ordering::AcqRel);
                } else {
                    // Artificial row whose score was reserved by the previous insertion
                    parents_linked = false;
                }
                index
            }
        };

        if parents_linked {
            for (position, parent_id) in parents.iter().enumerate() {
                if *parent_id == id {
                    continue;
                }

                let parent = match self.index_of(parent_id) {
                    Some(parent) => parent,
                    None => {
                        let score = match insertion {
                            Some(_) => self.revision(index).score() + 1 + position as i64,
                            None => self.max_score.fetch_add(1, Ordering::AcqRel) + 1,
                        };
                        self.insert_if_absent(*parent_id, score)
                    }
                };

                if self.revision(index).has_parent(parent) {
                    continue;
                }

                self.link(index, parent);

                if only_first_parent {
                    break;
                }
            }
        }

        // Published only now that all parents are linked and scored
        if !self.revision(index).set_flag(RevisionFlags::COMPLETED) {
            self.nodes.push(index);
        }

        Added {
            index,
            parents_linked,
        }
    }

    fn insert_if_absent(&self, id: ObjectId, score: i64) -> RevisionIdx {
        *self
            .by_id
            .entry(id)
            .or_insert_with(|| RevisionIdx(self.revisions.push(Revision::new(id, score))))
    }

    fn link(&self, child: RevisionIdx, parent: RevisionIdx) {
        let segment = SegmentIdx(self.segments.push(Segment { child, parent }));

        let child_revision = self.revision(child);
        self.revision(parent).children.push(child);
        child_revision.parents.push(parent);
        child_revision.start_segments.push(segment);

        if child_revision.is_relative() {
            self.make_relative(parent);
        }

        let raised = self.ensure_score_above(parent, child_revision.score() + 1);
        self.max_score.fetch_max(raised, Ordering::AcqRel);
    }

    /// Raises `index` to at least `minimal` and its ancestors above it.
    ///
    /// Returns the highest score seen on the way.
    fn ensure_score_above(&self, index: RevisionIdx, minimal: i64) -> i64 {
        let mut max = i64::MIN;
        let mut pending = vec![(index, minimal)];
        while let Some((index, minimal)) = pending.pop() {
            let revision = self.revision(index);
            match revision.raise_score(minimal) {
                None => max = max.max(revision.score()),
                Some(previous) => {
                    self.score_changed(revision, previous);
                    let score = revision.score();
                    max = max.max(score);
                    pending.extend(revision.parents().map(|parent| (parent, score + 1)));
                }
            }
        }
        max
    }

    fn shift_scores_below(&self, score: i64, range: i64) {
        for (_, revision) in self.revisions.iter() {
            if revision.score() < score {
                let previous = revision.offset_score(-range);
                self.score_changed(revision, previous);
            }
        }
    }

    fn score_changed(&self, revision: &Revision, previous: i64) {
        if revision.is_completed() {
            self.order_invalidated(previous);
        }
    }

    fn order_invalidated(&self, score: i64) {
        self.tracking.generation.fetch_add(1, Ordering::AcqRel);
        if score <= self.tracking.ordered_until_score.load(Ordering::Acquire) {
            self.tracking.reorder.store(true, Ordering::Release);
        }
    }

    /// Marks `index` and all its ancestors as relatives.
    pub(crate) fn make_relative(&self, index: RevisionIdx) {
        let mut pending = vec![index];
        while let Some(index) = pending.pop() {
            let revision = self.revision(index);
            if !revision.set_flag(RevisionFlags::RELATIVE) {
                pending.extend(revision.parents());
            }
        }
    }

    /// Clears the relative flag on every revision.
    pub(crate) fn clear_relatives(&self) {
        for (_, revision) in self.revisions.iter() {
            revision.clear_flag(RevisionFlags::RELATIVE);
        }
    }

    /// Verifies the topological order by brute force.
    ///
    /// Every parent of a completed revision must score strictly higher, every child strictly
    /// lower. This walks the complete graph and is meant for tests and debugging.
    ///
    /// # Errors
    /// Returns [`Error::TopologyViolation`] for the first offending edge found.
    pub fn validate_topo_order(&self) -> Result<()> {
        let nodes: Vec<RevisionIdx> = self.nodes().collect();
        nodes.par_iter().try_for_each(|&index| {
            let revision = self.revision(index);
            let score = revision.score();

            if let Some(parent) = revision
                .parents()
                .find(|&parent| self.revision(parent).score() <= score)
            {
                return Err(Error::TopologyViolation {
                    child: revision.id(),
                    parent: self.revision(parent).id(),
                });
            }

            if let Some(child) = revision
                .children()
                .find(|&child| score <= self.revision(child).score())
            {
                return Err(Error::TopologyViolation {
                    child: self.revision(child).id(),
                    parent: revision.id(),
                });
            }

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::helpers::oid;

    fn score(store: &NodeStore, name: &str) -> i64 {
        store.revision(store.index_of(&oid(name)).unwrap()).score()
    }

    #[test]
    fn test_add_in_topo_order() {
        let store = NodeStore::new();
        store.add(oid("c2"), &[oid("c1")], None, false);
        store.add(oid("c1"), &[], None, false);

        assert_eq!(store.count(), 2);
        assert!(score(&store, "c2") < score(&store, "c1"));
        assert!(store.validate_topo_order().is_ok());
    }

    #[test]
    fn test_placeholder_is_not_completed() {
        let store = NodeStore::new();
        store.add(oid("c2"), &[oid("c1")], None, false);

        assert_eq!(store.count(), 1);
        assert_eq!(store.revision_count(), 2);
        let c1 = store.index_of(&oid("c1")).unwrap();
        assert!(!store.revision(c1).is_completed());
        assert_eq!(store.revision(c1).child_count(), 1);
    }

    #[test]
    fn test_parent_added_first_is_raised() {
        let store = NodeStore::new();
        store.add(oid("c1"), &[], None, false);
        store.add(oid("c2"), &[oid("c1")], None, false);

        assert!(score(&store, "c1") > score(&store, "c2"));
        assert!(store.validate_topo_order().is_ok());
    }

    #[test]
    fn test_raise_propagates_to_ancestors() {
        let store = NodeStore::new();
        store.add(oid("c1"), &[], None, false);
        store.add(oid("c2"), &[oid("c1")], None, false);
        store.add(oid("c3"), &[oid("c2")], None, false);
        store.add(oid("c4"), &[oid("c3")], None, false);

        assert!(score(&store, "c4") < score(&store, "c3"));
        assert!(score(&store, "c3") < score(&store, "c2"));
        assert!(score(&store, "c2") < score(&store, "c1"));
        assert!(store.max_score() >= score(&store, "c1"));
        assert!(store.validate_topo_order().is_ok());
    }

    #[test]
    fn test_malformed_parents_are_deduplicated() {
        let store = NodeStore::new();
        store.add(oid("c2"), &[oid("c1"), oid("c1"), oid("c2")], None, false);

        let c2 = store.index_of(&oid("c2")).unwrap();
        assert_eq!(store.revision(c2).parent_count(), 1);
        assert_eq!(store.revision(c2).start_segments().count(), 1);
        assert!(store.validate_topo_order().is_ok());
    }

    #[test]
    fn test_only_first_parent() {
        let store = NodeStore::new();
        store.add(oid("m"), &[oid("a"), oid("b")], None, true);

        let m = store.index_of(&oid("m")).unwrap();
        assert_eq!(store.revision(m).parent_count(), 1);
        assert!(store.index_of(&oid("b")).is_none());
    }

    #[test]
    fn test_add_twice_is_listed_once() {
        let store = NodeStore::new();
        store.add(oid("c1"), &[], None, false);
        store.add(oid("c1"), &[], None, false);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_insertion_reserves_gap() {
        let store = NodeStore::new();
        store.add(oid("c3"), &[oid("c2")], None, false);
        store.add(oid("c2"), &[oid("c1")], None, false);
        store.add(oid("c1"), &[], None, false);

        let before: Vec<(ObjectId, i64)> = store
            .revisions()
            .map(|(_, revision)| (revision.id(), revision.score()))
            .collect();
        let head = score(&store, "c2");

        let added = store.add(
            ObjectId::WORK_TREE,
            &[ObjectId::INDEX],
            Some(Insertion {
                score: head,
                range: 2,
            }),
            false,
        );
        assert!(added.parents_linked);

        for (id, old) in before {
            let new = store.revision(store.index_of(&id).unwrap()).score();
            if old < head {
                assert_eq!(new, old - 2);
            } else {
                assert_eq!(new, old);
            }
        }

        let work_tree = store.revision(added.index).score();
        let index = store
            .revision(store.index_of(&ObjectId::INDEX).unwrap())
            .score();
        assert_eq!(work_tree, head - 2);
        assert_eq!(index, head - 1);

        let mut scores: Vec<i64> = store.revisions().map(|(_, r)| r.score()).collect();
        scores.sort_unstable();
        scores.dedup();
        assert_eq!(scores.len(), store.revision_count());

        // The second artificial row keeps its reserved score and gets no edges
        let added = store.add(
            ObjectId::INDEX,
            &[oid("c2")],
            Some(Insertion {
                score: head,
                range: 2,
            }),
            false,
        );
        assert!(!added.parents_linked);
        assert_eq!(store.revision(added.index).parent_count(), 0);
        assert_eq!(store.revision(added.index).score(), head - 1);
        assert!(store.validate_topo_order().is_ok());
    }

    #[test]
    fn test_score_change_after_ordering_marks_dirty() {
        let store = NodeStore::new();
        store.add(oid("c1"), &[], None, false);
        store
            .tracking
            .ordered_until_score
            .store(store.max_score(), Ordering::Release);
        store.tracking.reorder.store(false, Ordering::Release);
        let generation = store.tracking.generation.load(Ordering::Acquire);

        // c1 is raised above its new child
        store.add(oid("c2"), &[oid("c1")], None, false);
        assert!(store.tracking.reorder.load(Ordering::Acquire));
        assert!(store.tracking.generation.load(Ordering::Acquire) > generation);
    }

    #[test]
    fn test_insertion_above_first_row_marks_dirty() {
        let store = NodeStore::new();
        store.add(oid("c2"), &[oid("c1")], None, false);
        store.add(oid("c1"), &[], None, false);
        store
            .tracking
            .ordered_until_score
            .store(store.max_score(), Ordering::Release);
        store.tracking.reorder.store(false, Ordering::Release);
        let generation = store.tracking.generation.load(Ordering::Acquire);

        // Nothing scores below the head, so no existing score moves
        let head = score(&store, "c2");
        store.add(
            ObjectId::WORK_TREE,
            &[oid("c2")],
            Some(Insertion {
                score: head,
                range: 1,
            }),
            false,
        );
        assert_eq!(score(&store, "c2"), head);
        assert!(store.tracking.reorder.load(Ordering::Acquire));
        assert!(store.tracking.generation.load(Ordering::Acquire) > generation);
    }

    #[test]
    fn test_relative_propagates_to_new_parents() {
        let store = NodeStore::new();
        store.add(oid("c2"), &[oid("c1")], None, false);
        store.make_relative(store.index_of(&oid("c2")).unwrap());
        store.add(oid("c1"), &[oid("c0")], None, false);

        let c0 = store.index_of(&oid("c0")).unwrap();
        assert!(store.revision(c0).is_relative());

        store.clear_relatives();
        assert!(!store.revision(c0).is_relative());
    }

    #[test]
    fn test_validate_detects_violation() {
        let store = NodeStore::new();
        store.add(oid("c2"), &[oid("c1")], None, false);
        store.add(oid("c1"), &[], None, false);

        let c1 = store.index_of(&oid("c1")).unwrap();
        store.revision(c1).offset_score(-1000);
        assert!(matches!(
            store.validate_topo_order(),
            Err(Error::TopologyViolation { .. })
        ));
    }
}
