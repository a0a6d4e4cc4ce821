//! Incremental construction of the row cache.
//!
//! Rows are built strictly in order, each one from the row above: segments not ending at the
//! previous revision are carried forward, and the segments starting at the current revision
//! are spliced in where the first line reaching it arrives. A revision nobody leads to starts
//! its segments at the right end.
//!
//! # Publication
//!
//! The published rows are never mutated. A build clones the list of row handles, appends and
//! straightens rows in the clone (straightening copies a shared row before touching it) and
//! swaps the result in at the end. Concurrent readers keep whatever snapshot they hold.
//!
//! # Invalidation
//!
//! When the ordering changed under already built rows, the cache is truncated from the first
//! row whose revision no longer matches, minus the rows whose lane order or straightening
//! looked at the changed part, and rebuilt from there.

use std::sync::{Arc, RwLock};

use crate::{
    config::GraphConfig,
    graph::{
        crossing,
        laneinfo::LaneInfo,
        ordering::OrderedNodes,
        revision::RevisionIdx,
        row::{Row, RowSegment},
        segment::SegmentIdx,
        store::NodeStore,
        straighten,
    },
};

/// An immutable list of laid out rows.
pub type Rows = Vec<Arc<Row>>;

/// Holds the last published rows.
#[derive(Debug, Default)]
pub(crate) struct RowCache {
    snapshot: RwLock<Option<Arc<Rows>>>,
}

impl RowCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last published rows.
    pub fn current(&self) -> Option<Arc<Rows>> {
        read_lock!(self.snapshot).clone()
    }

    pub fn clear(&self) {
        *write_lock!(self.snapshot) = None;
    }

    /// Number of published rows, minus those straightening may still change.
    pub fn cached_count(&self, count: usize, loading_completed: bool, withheld: usize) -> usize {
        let Some(rows) = self.current() else {
            return 0;
        };

        if loading_completed && rows.len() == count {
            rows.len()
        } else {
            rows.len().saturating_sub(withheld)
        }
    }

    /// Extends the rows through `last` and straightens the new part.
    ///
    /// `last` includes the straightening look-ahead already. Returns true if a new row list was
    /// published.
    pub fn build(
        &self,
        store: &NodeStore,
        ordered: &OrderedNodes,
        config: &GraphConfig,
        last: usize,
        loading_completed: bool,
    ) -> bool {
        let published = self.current();
        let mut rows: Rows = published
            .as_deref()
            .cloned()
            .unwrap_or_else(|| Vec::with_capacity(last.saturating_add(1).min(ordered.len())));

        let valid = valid_prefix(&rows, ordered);
        let truncated = valid < rows.len();
        if truncated {
            let keep =
                valid.saturating_sub(config.order_segments_look_ahead + config.straighten_look_ahead());
            log::debug!(
                "row cache diverges from ordering at row {valid}, rebuilding from row {keep}"
            );
            rows.truncate(keep);
        }

        let Some(last_ordered) = ordered.len().checked_sub(1) else {
            return truncated && self.publish(published.as_ref(), rows);
        };

        // Crossing reduction needs its look-ahead ordered as long as more revisions may arrive
        let mut completed = loading_completed;
        let reserve = if completed || !config.reduce_crossings {
            0
        } else {
            config.order_segments_look_ahead
        };
        let mut last = last;
        match last_ordered.checked_sub(reserve) {
            Some(max_last) if last <= max_last => {}
            Some(max_last) => {
                last = max_last;
                completed = false;
            }
            None => return truncated && self.publish(published.as_ref(), rows),
        }

        let start = rows.len();
        if start > last {
            return truncated && self.publish(published.as_ref(), rows);
        }

        for index in start..=last {
            let Some(revision) = ordered.get(index) else {
                break;
            };

            let mut starts: Vec<SegmentIdx> = store.revision(revision).start_segments().collect();
            if config.reduce_crossings {
                crossing::order_segments(
                    store,
                    &mut starts,
                    ordered.as_slice(),
                    index,
                    config.order_segments_look_ahead,
                );
            }

            let previous = index.checked_sub(1).and_then(|i| rows.get(i)).cloned();
            let segments = next_segments(
                store,
                revision,
                &starts,
                previous.as_deref(),
                config.lane_color_count,
            );
            rows.push(Arc::new(Row::new(
                revision,
                segments,
                previous.as_deref(),
                config.merge_lanes_having_common_parent,
            )));
        }

        invariant!(
            rows.len() == last + 1,
            "built {} rows, expected {}",
            rows.len(),
            last + 1
        );
        let Some(last) = rows.len().checked_sub(1) else {
            return truncated && self.publish(published.as_ref(), rows);
        };

        // The first and the last row are never straightened, and only rows with a complete
        // look-ahead are
        let completed = completed && last == last_ordered;
        let lanes_look_ahead = config.straighten_lanes_look_ahead;
        let lanes_last = if completed {
            last.checked_sub(1)
        } else {
            last.checked_sub(lanes_look_ahead)
        };
        if let Some(lanes_last) = lanes_last {
            straighten::straighten_lanes(
                &mut rows,
                start.saturating_sub(lanes_look_ahead).max(1),
                lanes_last,
                last,
                lanes_look_ahead,
                config.max_lanes,
            );
        }

        let diagonals_look_ahead = config.straighten_diagonals_look_ahead();
        if diagonals_look_ahead > 0 {
            let diagonals_last = if completed {
                last.checked_sub(1)
            } else {
                last.checked_sub(lanes_look_ahead + diagonals_look_ahead)
            };
            if let Some(diagonals_last) = diagonals_last {
                straighten::straighten_diagonals(
                    &mut rows,
                    start
                        .saturating_sub(lanes_look_ahead + diagonals_look_ahead)
                        .max(1),
                    diagonals_last,
                    last,
                    diagonals_look_ahead,
                    config.max_lanes,
                );
            }
        }

        self.publish(published.as_ref(), rows)
    }

    /// Swaps in `rows` unless another build published a longer list in the meantime.
    fn publish(&self, base: Option<&Arc<Rows>>, rows: Rows) -> bool {
        let mut slot = write_lock!(self.snapshot);
        let unchanged = match (slot.as_ref(), base) {
            (Some(current), Some(base)) => Arc::ptr_eq(current, base),
            (None, None) => true,
            _ => false,
        };

        if !unchanged && slot.as_ref().is_some_and(|current| current.len() >= rows.len()) {
            return false;
        }

        log::trace!("publishing {} rows", rows.len());
        *slot = Some(Arc::new(rows));
        true
    }
}

/// Number of leading rows still showing the revision the ordering has at their index.
fn valid_prefix(rows: &[Arc<Row>], ordered: &OrderedNodes) -> usize {
    rows.iter()
        .zip(ordered.iter())
        .position(|(row, revision)| row.revision() != revision)
        .unwrap_or_else(|| rows.len().min(ordered.len()))
}

fn row_segment(store: &NodeStore, segment: SegmentIdx, lane_info: LaneInfo) -> RowSegment {
    let ends = store.segment(segment);
    RowSegment {
        segment,
        child: ends.child,
        parent: ends.parent,
        lane_info,
    }
}

/// Computes the segments of the row showing `revision`.
///
/// `starts` are the segments starting at `revision`, in lane order.
fn next_segments(
    store: &NodeStore,
    revision: RevisionIdx,
    starts: &[SegmentIdx],
    previous: Option<&Row>,
    palette: u32,
) -> Vec<RowSegment> {
    let Some(previous) = previous else {
        return new_branch(store, starts, Vec::with_capacity(starts.len()), palette);
    };

    let mut segments = Vec::with_capacity(previous.segments().len() + starts.len());
    let mut start_infos: Vec<Option<LaneInfo>> = vec![None; starts.len()];
    let mut splice_at = None;

    for entry in previous
        .segments()
        .iter()
        .filter(|entry| entry.parent != previous.revision())
    {
        segments.push(*entry);
        if entry.parent != revision {
            continue;
        }

        splice_at.get_or_insert(segments.len());

        // The first parent continues the oldest line arriving here, the others branch off it
        let incoming = entry.lane_info;
        let mut left = Some(incoming);
        for (position, &start) in starts.iter().enumerate() {
            let info = &mut start_infos[position];
            if position == 0 {
                if info.map_or(true, |info| info.start_score(store) > incoming.start_score(store)) {
                    *info = Some(incoming);
                }
            } else if info.is_none() {
                *info = Some(LaneInfo::new(
                    store,
                    store.segment(start),
                    Some(&incoming),
                    left.as_ref(),
                    palette,
                ));
            }
            left = *info;
        }
    }

    match splice_at {
        Some(at) => {
            let spliced: Vec<RowSegment> = starts
                .iter()
                .zip(start_infos)
                .map(|(&start, info)| {
                    let info = info.unwrap_or_else(|| {
                        LaneInfo::new(store, store.segment(start), None, None, palette)
                    });
                    row_segment(store, start, info)
                })
                .collect();
            segments.splice(at..at, spliced);
            segments
        }
        None => new_branch(store, starts, segments, palette),
    }
}

/// Appends `starts` as new lines at the right of `segments`.
fn new_branch(
    store: &NodeStore,
    starts: &[SegmentIdx],
    mut segments: Vec<RowSegment>,
    palette: u32,
) -> Vec<RowSegment> {
    let mut left = segments.last().map(|entry| entry.lane_info);
    for &start in starts {
        let info = LaneInfo::new(store, store.segment(start), None, left.as_ref(), palette);
        segments.push(row_segment(store, start, info));
        left = Some(info);
    }
    segments
}
