//! Rows of the laid out graph.
//!
//! A [`Row`] is what the rendering back-end draws for one revision: the revision itself, all
//! segments passing through or touching it, and a [`Lane`] per segment. Lanes are assigned
//! when the row is created, from the left in segment order, and are afterwards only ever
//! shifted to the right by the straightening passes.
//!
//! # Lane sharing
//!
//! Several segments can be drawn in the same lane:
//!
//! - all segments touching the revision share the revision lane; the first one is primary,
//!   the other segments ending at the revision are [`LaneSharing::DifferentStart`] and
//!   segments starting there [`LaneSharing::DifferentEnd`]
//! - with lane merging enabled, a pass-through segment heading to the same parent as an
//!   earlier pass-through joins its lane

use strum::Display;

use crate::graph::{laneinfo::LaneInfo, revision::RevisionIdx, segment::SegmentIdx};

/// How a segment shares its lane with others in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum LaneSharing {
    /// The segment owns the lane, or is its primary segment
    ExclusiveOrPrimary,
    /// The segment shares the end of the lane and has a different start
    DifferentStart,
    /// The segment shares the start of the lane and has a different end
    DifferentEnd,
    /// The segment coincides with the primary segment of the lane in this row
    Entire,
}

/// The column a segment is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lane {
    /// Column index, starting at 0 from the left
    pub index: usize,
    /// How the column is shared
    pub sharing: LaneSharing,
}

/// A segment as it appears in one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSegment {
    /// The segment
    pub segment: SegmentIdx,
    /// The revision the segment starts at
    pub child: RevisionIdx,
    /// The revision the segment ends at
    pub parent: RevisionIdx,
    /// Color grouping of the line this segment belongs to
    pub lane_info: LaneInfo,
}

/// One laid out row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    revision: RevisionIdx,
    segments: Vec<RowSegment>,
    lanes: Vec<Lane>,
    revision_lane: usize,
}

impl Row {
    /// Creates a row and assigns its lanes.
    ///
    /// `previous` is the row above, used to detect merged pass-through lanes which were
    /// already merged there.
    pub(crate) fn new(
        revision: RevisionIdx,
        segments: Vec<RowSegment>,
        previous: Option<&Row>,
        merge_lanes: bool,
    ) -> Self {
        let mut lanes: Vec<Lane> = Vec::with_capacity(segments.len());
        let mut revision_lane = None;
        let mut next_lane = 0;

        for (position, current) in segments.iter().enumerate() {
            if current.parent == revision || current.child == revision {
                let lane = match revision_lane {
                    None => {
                        revision_lane = Some(next_lane);
                        next_lane += 1;
                        Lane {
                            index: next_lane - 1,
                            sharing: LaneSharing::ExclusiveOrPrimary,
                        }
                    }
                    Some(index) => Lane {
                        index,
                        sharing: if current.parent == revision {
                            LaneSharing::DifferentStart
                        } else {
                            LaneSharing::DifferentEnd
                        },
                    },
                };
                lanes.push(lane);
                continue;
            }

            if merge_lanes {
                let common = segments[..position]
                    .iter()
                    .zip(&lanes)
                    .find(|(earlier, _)| {
                        earlier.parent == current.parent
                            && earlier.parent != revision
                            && earlier.child != revision
                    });

                if let Some((earlier, lane)) = common {
                    let merged_before = previous.is_some_and(|previous| {
                        match (
                            previous.lane_for(earlier.segment),
                            previous.lane_for(current.segment),
                        ) {
                            (Some(a), Some(b)) => a.index == b.index,
                            _ => false,
                        }
                    });

                    lanes.push(Lane {
                        index: lane.index,
                        sharing: if merged_before {
                            LaneSharing::Entire
                        } else {
                            LaneSharing::DifferentStart
                        },
                    });
                    continue;
                }
            }

            lanes.push(Lane {
                index: next_lane,
                sharing: LaneSharing::ExclusiveOrPrimary,
            });
            next_lane += 1;
        }

        Row {
            revision,
            segments,
            lanes,
            revision_lane: revision_lane.unwrap_or(next_lane),
        }
    }

    /// The revision shown in this row.
    #[must_use]
    pub fn revision(&self) -> RevisionIdx {
        self.revision
    }

    /// The segments of this row, in lane assignment order.
    #[must_use]
    pub fn segments(&self) -> &[RowSegment] {
        &self.segments
    }

    /// The segments of this row together with their lanes.
    pub fn segment_lanes(&self) -> impl Iterator<Item = (&RowSegment, Lane)> + '_ {
        self.segments.iter().zip(self.lanes.iter().copied())
    }

    /// The lane the revision node is drawn in.
    #[must_use]
    pub fn revision_lane(&self) -> usize {
        self.revision_lane
    }

    /// Number of lanes needed to draw this row, including gaps left by straightening.
    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.lanes
            .iter()
            .map(|lane| lane.index + 1)
            .max()
            .unwrap_or(0)
            .max(self.revision_lane + 1)
    }

    /// The lane of `segment`, if it is part of this row.
    #[must_use]
    pub fn lane_for(&self, segment: SegmentIdx) -> Option<Lane> {
        self.position(segment).map(|position| self.lanes[position])
    }

    /// The row entry of `segment`, if it is part of this row.
    #[must_use]
    pub fn get(&self, segment: SegmentIdx) -> Option<&RowSegment> {
        self.position(segment).map(|position| &self.segments[position])
    }

    /// All segments drawn in lane `index`.
    pub fn segments_in_lane(&self, index: usize) -> impl Iterator<Item = &RowSegment> + '_ {
        self.segment_lanes()
            .filter(move |(_, lane)| lane.index == index)
            .map(|(segment, _)| segment)
    }

    /// Follows a line through this row.
    ///
    /// A segment ending at this row's revision continues with the first segment starting here;
    /// any other segment continues as itself.
    #[must_use]
    pub fn first_parent_or_self(&self, segment: SegmentIdx) -> SegmentIdx {
        match self.get(segment) {
            Some(entry) if entry.parent == self.revision => self
                .segments
                .iter()
                .find(|s| s.child == self.revision)
                .map_or(segment, |s| s.segment),
            _ => segment,
        }
    }

    /// Shifts all lanes at or right of `from` by `by` columns.
    pub fn move_lanes_right(&mut self, from: usize, by: usize) {
        for lane in &mut self.lanes {
            if lane.index >= from {
                lane.index += by;
            }
        }

        if self.revision_lane >= from {
            self.revision_lane += by;
        }
    }

    fn position(&self, segment: SegmentIdx) -> Option<usize> {
        self.segments.iter().position(|s| s.segment == segment)
    }
}
