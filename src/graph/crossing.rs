//! Crossing reduction for the segments starting at a revision.
//!
//! The segments leaving a revision are assigned lanes from left to right in the order they are
//! listed. Putting the segment first whose parent comes up soonest, or which merges into or
//! branches from another line, keeps long lines out of the way of short ones. This is a
//! best-effort heuristic over a bounded window of rows; it decides lane order only, never
//! which segments a row contains.

use std::{cmp::Ordering, collections::HashSet};

use crate::graph::{revision::RevisionIdx, segment::SegmentIdx, store::NodeStore};

/// Sort key of a segment: unreachable parents last, then merges, branches and plain commits,
/// then the distance to the parent's row.
type SegmentKey = (bool, u8, usize);

/// Reorders the segments starting in `row` to reduce crossings.
///
/// `ordered` is the ordering of all revisions; the parent of each segment is searched for in
/// the `look_ahead` rows after `row`. The sort is stable: segments the heuristic cannot tell
/// apart keep their order.
pub fn order_segments(
    store: &NodeStore,
    segments: &mut [SegmentIdx],
    ordered: &[RevisionIdx],
    row: usize,
    look_ahead: usize,
) {
    if segments.len() < 2 {
        return;
    }

    let window = Window {
        store,
        ordered,
        row,
        end: row.saturating_add(look_ahead).min(ordered.len()),
    };

    let mut keyed: Vec<(SegmentIdx, RevisionIdx, Option<usize>)> = segments
        .iter()
        .map(|&segment| {
            let parent = store.segment(segment).parent;
            (segment, parent, window.offset(parent))
        })
        .collect();

    // Insertion sort: the ancestor rule makes the comparator non-transitive
    for i in 1..keyed.len() {
        let mut j = i;
        while j > 0 && window.compare(&keyed[j - 1], &keyed[j]) == Ordering::Greater {
            keyed.swap(j - 1, j);
            j -= 1;
        }
    }

    for (slot, (segment, _, _)) in segments.iter_mut().zip(keyed) {
        *slot = segment;
    }
}

struct Window<'a> {
    store: &'a NodeStore,
    ordered: &'a [RevisionIdx],
    row: usize,
    end: usize,
}

impl Window<'_> {
    /// Distance in rows from the current row to `revision`, if it is within the window.
    fn offset(&self, revision: RevisionIdx) -> Option<usize> {
        let start = self.row + 1;
        if start >= self.end {
            return None;
        }

        self.ordered[start..self.end]
            .iter()
            .position(|&r| r == revision)
            .map(|position| position + 1)
    }

    fn compare(
        &self,
        (_, parent_a, row_a): &(SegmentIdx, RevisionIdx, Option<usize>),
        (_, parent_b, row_b): &(SegmentIdx, RevisionIdx, Option<usize>),
    ) -> Ordering {
        // Prefer the segment heading to the ancestor of the other one's parent
        if let (Some(a), Some(b)) = (*row_a, *row_b) {
            if a > b && self.is_ancestor_of(*parent_a, *parent_b, a) {
                return Ordering::Less;
            }
            if b > a && self.is_ancestor_of(*parent_b, *parent_a, b) {
                return Ordering::Greater;
            }
        }

        self.key(*parent_a, *row_a).cmp(&self.key(*parent_b, *row_b))
    }

    fn key(&self, parent: RevisionIdx, row: Option<usize>) -> SegmentKey {
        let revision = self.store.revision(parent);
        let tier = if revision.parent_count() == 0 {
            2
        } else if revision.parent_count() > 1 {
            0
        } else if revision.child_count() > 1 {
            1
        } else {
            2
        };

        (row.is_none(), tier, row.unwrap_or(usize::MAX))
    }

    /// Whether `ancestor` is reachable from `child` through revisions before `stop_row`.
    fn is_ancestor_of(&self, ancestor: RevisionIdx, child: RevisionIdx, stop_row: usize) -> bool {
        let mut visited = HashSet::new();
        let mut pending = vec![child];
        while let Some(current) = pending.pop() {
            let revision = self.store.revision(current);
            if revision.has_parent(ancestor) {
                return true;
            }

            for parent in revision.parents() {
                if self.offset(parent).is_some_and(|row| row < stop_row) && visited.insert(parent)
                {
                    pending.push(parent);
                }
            }
        }

        false
    }
}
