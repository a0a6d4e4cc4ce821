//! Score-sorted snapshots of the completed revisions.
//!
//! Sorting is cheap compared to laying out rows, so the ordering is rebuilt from scratch
//! whenever it may be stale. A rebuild takes the scores of all completed revisions, sorts the
//! copy and publishes it as a new immutable [`OrderedNodes`]. Scores can be raised by the
//! producer while this happens; a changed generation token sends the rebuild around again.

use std::sync::{atomic::Ordering, Arc, RwLock};

use crate::graph::{revision::RevisionIdx, store::NodeStore};

/// Rebuild attempts before a snapshot is published while scores are still moving.
const MAX_SORT_ATTEMPTS: usize = 8;

/// An immutable snapshot of the completed revisions in ascending score order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedNodes {
    revisions: Vec<RevisionIdx>,
}

impl OrderedNodes {
    /// Number of ordered revisions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    /// Returns true if nothing is ordered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// The revision shown at `row`.
    #[must_use]
    pub fn get(&self, row: usize) -> Option<RevisionIdx> {
        self.revisions.get(row).copied()
    }

    /// The row at which `revision` is shown.
    #[must_use]
    pub fn position(&self, revision: RevisionIdx) -> Option<usize> {
        self.revisions.iter().position(|&r| r == revision)
    }

    /// The ordered revisions.
    #[must_use]
    pub fn as_slice(&self) -> &[RevisionIdx] {
        &self.revisions
    }

    /// Iterates over the ordered revisions.
    pub fn iter(&self) -> impl Iterator<Item = RevisionIdx> + '_ {
        self.revisions.iter().copied()
    }
}

/// Holds the last published ordering.
#[derive(Debug, Default)]
pub(crate) struct OrderingCache {
    snapshot: RwLock<Option<Arc<OrderedNodes>>>,
}

impl OrderingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last published ordering, without checking whether it is still valid.
    pub fn current(&self) -> Option<Arc<OrderedNodes>> {
        read_lock!(self.snapshot).clone()
    }

    pub fn clear(&self) {
        *write_lock!(self.snapshot) = None;
    }

    /// Returns an ordering valid at least through row `up_to`.
    ///
    /// The published snapshot is reused unless a score it includes changed or it is shorter
    /// than requested (capped at the number of completed revisions).
    pub fn get(&self, store: &NodeStore, up_to: usize) -> Arc<OrderedNodes> {
        let needed = store.count().min(up_to.saturating_add(1));
        if let Some(snapshot) = self.current() {
            if !store.tracking.reorder.load(Ordering::Acquire) && snapshot.len() >= needed {
                return snapshot;
            }
        }

        let snapshot = Arc::new(Self::sort(store));
        *write_lock!(self.snapshot) = Some(snapshot.clone());
        snapshot
    }

    fn sort(store: &NodeStore) -> OrderedNodes {
        Self::sort_with(store, |_| {})
    }

    /// Sorts like [`Self::sort`], calling `sorted` with the attempt number after each sort.
    fn sort_with(store: &NodeStore, mut sorted: impl FnMut(usize)) -> OrderedNodes {
        let tracking = &store.tracking;

        // Nothing is ordered while sorting, score changes only bump the generation
        tracking.reorder.store(false, Ordering::Release);
        tracking
            .ordered_until_score
            .store(i64::MIN, Ordering::Release);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let generation = tracking.generation.load(Ordering::Acquire);

            let mut keyed: Vec<(i64, RevisionIdx)> = store
                .nodes()
                .map(|index| (store.revision(index).score(), index))
                .collect();
            keyed.sort_unstable();

            let ordered_until = keyed.last().map_or(i64::MIN, |(score, _)| *score);
            tracking
                .ordered_until_score
                .store(ordered_until, Ordering::Release);
            sorted(attempt);

            let stable = generation == tracking.generation.load(Ordering::Acquire);
            if stable || attempt >= MAX_SORT_ATTEMPTS {
                if !stable {
                    log::debug!(
                        "publishing ordering of {} revisions after {} attempts, scores still moving",
                        keyed.len(),
                        attempt
                    );
                    tracking.reorder.store(true, Ordering::Release);
                }

                return OrderedNodes {
                    revisions: keyed.into_iter().map(|(_, index)| index).collect(),
                };
            }

            log::debug!("scores changed while ordering, retrying (attempt {attempt})");
        }
    }
}
