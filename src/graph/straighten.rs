//! Straightening of laid out rows.
//!
//! Lanes are assigned greedily per row, so a line jumps left whenever a lane to its left ends,
//! even if it jumps right again a few rows later. The passes in this module look a bounded
//! number of rows ahead and shift lanes of already built rows to the right to turn such
//! zig-zags into straight verticals or continuous diagonals.
//!
//! A move always shifts every lane at or right of a column, so it never changes the relative
//! order of segments in a row and never makes two exclusive segments collide. Only segments
//! with [`LaneSharing::ExclusiveOrPrimary`] lanes are examined, lanes shared with another
//! segment are left alone.
//!
//! After a successful move the pass goes back up to one look-ahead window, since straightening
//! a row can enable straightening of rows before it. The go-back never reaches before the
//! window of any row already examined, which guarantees progress; a move budget per call stops
//! the pass on pathological input.

use std::sync::Arc;

use crate::graph::{
    row::{LaneSharing, Row},
    segment::SegmentIdx,
};

/// Lane index of a segment which is not part of a row.
const NO_LANE: isize = -1;

/// Moves allowed per examined row and lane before a pass gives up.
const MOVES_PER_LANE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LaneMove {
    row: usize,
    lane: usize,
    by: usize,
}

#[allow(clippy::cast_possible_wrap)]
fn lane_of(row: &Row, segment: SegmentIdx) -> (isize, LaneSharing) {
    row.lane_for(segment).map_or((NO_LANE, LaneSharing::ExclusiveOrPrimary), |lane| {
        (lane.index as isize, lane.sharing)
    })
}

fn lane_index(row: &Row, segment: SegmentIdx) -> isize {
    lane_of(row, segment).0
}

fn apply(rows: &mut [Arc<Row>], moves: &[LaneMove]) {
    for lane_move in moves {
        Arc::make_mut(&mut rows[lane_move.row]).move_lanes_right(lane_move.lane, lane_move.by);
    }
}

fn move_budget(start: usize, last: usize, max_lanes: usize) -> usize {
    (last + 1 - start)
        .saturating_mul(max_lanes)
        .saturating_mul(MOVES_PER_LANE)
}

/// Removes one-lane zig-zags from rows `start..=last`.
///
/// A line shifting one lane left and, within `look_ahead` rows, back right again is kept in
/// the right lane in between:
///
/// ```text
/// | | |        | | |
/// |/ /         |/  |
/// * |    =>    *   |
/// | |          |   |
/// |\ \         |\  |
/// | | |        | | |
/// ```
///
/// Rows after `last` up to `last_look_ahead` are looked at but not examined themselves. Row 0
/// is never examined, `start` must be at least 1 and `last_look_ahead` a valid index.
pub fn straighten_lanes(
    rows: &mut [Arc<Row>],
    start: usize,
    last: usize,
    last_look_ahead: usize,
    look_ahead: usize,
    max_lanes: usize,
) {
    if start == 0 || start > last || last > last_look_ahead || last_look_ahead >= rows.len() {
        return;
    }

    let budget = move_budget(start, last, max_lanes);
    let mut moves = 0;
    let mut go_back_limit = 1;
    let mut current = start;
    while current <= last {
        go_back_limit = go_back_limit.max(current.saturating_sub(look_ahead));

        match find_lane_move(rows, current, last_look_ahead, look_ahead, max_lanes) {
            Some((lane, until)) => {
                for row in &mut rows[current..until] {
                    Arc::make_mut(row).move_lanes_right(lane, 1);
                }

                moves += 1;
                if moves >= budget {
                    log::debug!("lane straightening stopped at row {current} after {moves} moves");
                    return;
                }
                current = current.saturating_sub(look_ahead).max(go_back_limit);
            }
            None => current += 1,
        }
    }
}

/// Finds the first zig-zag starting at row `current`.
///
/// Returns the lane to move right and the end (exclusive) of the rows to move.
fn find_lane_move(
    rows: &[Arc<Row>],
    current: usize,
    last_look_ahead: usize,
    look_ahead: usize,
    max_lanes: usize,
) -> Option<(usize, usize)> {
    let current_row = &rows[current];
    let previous_row = &rows[current - 1];
    let end = (current + look_ahead).min(last_look_ahead);

    for (entry, lane) in current_row.segment_lanes().take(max_lanes) {
        if lane.sharing != LaneSharing::ExclusiveOrPrimary {
            continue;
        }

        #[allow(clippy::cast_possible_wrap)]
        let current_lane = lane.index as isize;
        let previous_lane = lane_index(previous_row, entry.segment);
        if previous_lane <= current_lane {
            continue;
        }

        let straightened = current_lane + 1;
        let mut look_ahead_lane = current_lane;
        let mut segment = current_row.first_parent_or_self(entry.segment);
        let mut index = current + 1;
        while look_ahead_lane == current_lane && index <= end {
            let row = &rows[index];
            look_ahead_lane = lane_index(row, segment);
            if look_ahead_lane == straightened
                || (look_ahead_lane > straightened && previous_lane == straightened)
            {
                return Some((lane.index, index));
            }

            segment = row.first_parent_or_self(segment);
            index += 1;
        }
    }

    None
}

/// Turns lane shifts in rows `start..=last` into continuous diagonals.
///
/// Three patterns are detected, each within `look_ahead` rows:
///
/// - a line shifting left by one lane twice in a row is unfolded into one diagonal
/// - a line crossing several lanes in one row is turned into a diagonal over several rows
/// - two multi-lane crossings right before and after a row are joined into one bow
///
/// `start` must be at least 1 and `last_look_ahead` a valid index.
pub fn straighten_diagonals(
    rows: &mut [Arc<Row>],
    start: usize,
    last: usize,
    last_look_ahead: usize,
    look_ahead: usize,
    max_lanes: usize,
) {
    if start == 0 || start > last || last > last_look_ahead || last_look_ahead >= rows.len() {
        return;
    }

    let budget = move_budget(start, last, max_lanes);
    let mut moves = 0;
    let mut go_back_limit = 1;
    let mut current = start;
    while current <= last {
        go_back_limit = go_back_limit.max(current.saturating_sub(look_ahead));
        let current_last_look_ahead = (current + look_ahead).min(last_look_ahead);

        match find_diagonal_moves(rows, current, current_last_look_ahead, max_lanes) {
            Some(found) => {
                apply(rows, &found);

                moves += 1;
                if moves >= budget {
                    log::debug!(
                        "diagonal straightening stopped at row {current} after {moves} moves"
                    );
                    return;
                }
                current = current.saturating_sub(look_ahead).max(go_back_limit);
            }
            None => current += 1,
        }
    }
}

fn find_diagonal_moves(
    rows: &[Arc<Row>],
    current: usize,
    last_look_ahead: usize,
    max_lanes: usize,
) -> Option<Vec<LaneMove>> {
    let current_row = &rows[current];
    let previous_row = &rows[current - 1];

    for (entry, lane) in current_row.segment_lanes().take(max_lanes) {
        if lane.sharing != LaneSharing::ExclusiveOrPrimary {
            continue;
        }

        #[allow(clippy::cast_possible_wrap)]
        let current_lane = lane.index as isize;
        let diagonal = Diagonal {
            rows,
            current,
            last_look_ahead,
            segment: entry.segment,
            current_lane,
            previous_lane: lane_index(previous_row, entry.segment),
        };

        if let Some(found) = diagonal.unfold_one_lane_shift() {
            return Some(found);
        }

        if let Some(found) = diagonal
            .turn_crossing_into_diagonal(1)
            .or_else(|| diagonal.turn_crossing_into_diagonal(-1))
        {
            return Some(found);
        }

        if let Some(found) = diagonal.join_crossings() {
            return Some(found);
        }
    }

    None
}

/// One segment of the current row under examination.
struct Diagonal<'a> {
    rows: &'a [Arc<Row>],
    current: usize,
    last_look_ahead: usize,
    segment: SegmentIdx,
    current_lane: isize,
    previous_lane: isize,
}

impl Diagonal<'_> {
    fn move_current(&self, by: isize) -> Vec<LaneMove> {
        vec![LaneMove {
            row: self.current,
            lane: self.current_lane.unsigned_abs(),
            by: by.unsigned_abs(),
        }]
    }

    fn is_previous_lane_diagonal(&self, delta: isize) -> bool {
        if self.current < 2 {
            return false;
        }

        let lane = lane_index(&self.rows[self.current - 2], self.segment);
        lane >= 0 && lane == self.previous_lane + delta
    }

    /// ```text
    /// * | |        * | |
    /// |/ /         |/  |
    /// * |    =>    *   |
    /// | |          |  /
    /// * |          * /
    /// |/           |/
    /// *            *
    /// ```
    fn unfold_one_lane_shift(&self) -> Option<Vec<LaneMove>> {
        if self.current_lane != self.previous_lane - 1 || self.current + 2 > self.last_look_ahead
        {
            return None;
        }

        let current_row = &self.rows[self.current];
        let next_row = &self.rows[self.current + 1];
        let segment = current_row.first_parent_or_self(self.segment);
        let next_lane = lane_index(next_row, segment);
        if next_lane != self.current_lane {
            return None;
        }

        let segment = next_row.first_parent_or_self(segment);
        let end_lane = lane_index(&self.rows[self.current + 2], segment);
        if end_lane >= 0 && end_lane == next_lane - 1 && !self.is_previous_lane_diagonal(1) {
            return Some(self.move_current(1));
        }

        None
    }

    /// Follows the line while it stays left of a diagonal with slope `delta`.
    ///
    /// ```text
    /// * |              * |
    /// | |              |  \
    /// * |        =>    *   \
    /// |\-.-.           |\-. \
    /// * | | |          * | | |
    /// ```
    fn turn_crossing_into_diagonal(&self, delta: isize) -> Option<Vec<LaneMove>> {
        let mut moves: Vec<LaneMove> = Vec::new();
        let mut segment = self.segment;
        let mut diagonal_lane = if self.previous_lane >= 0 {
            self.previous_lane
        } else {
            self.current_lane
        };

        for index in self.current..=self.last_look_ahead {
            diagonal_lane += delta;
            let end_row = &self.rows[index];
            let (end_lane, sharing) = lane_of(end_row, segment);
            let move_by = diagonal_lane - end_lane;
            let last_chance = sharing == LaneSharing::DifferentStart;
            if move_by < 0
                || end_lane < 0
                || !(sharing == LaneSharing::ExclusiveOrPrimary || last_chance)
            {
                return None;
            }

            // Unfold a one-lane shift at the end of the diagonal, too
            if move_by >= 2
                && moves.len() == 2
                && index == self.current + 3
                && moves[1].by == 1
            {
                moves.truncate(1);
                return Some(moves);
            }

            if move_by == 0 && !moves.is_empty() {
                return Some(moves);
            }

            if last_chance {
                return None;
            }

            if move_by > 0 {
                moves.push(LaneMove {
                    row: index,
                    lane: end_lane.unsigned_abs(),
                    by: move_by.unsigned_abs(),
                });
            }

            segment = end_row.first_parent_or_self(segment);
        }

        None
    }

    /// ```text
    /// | | * |        | | * |
    /// | |/ /         | |/  |
    /// | * |    =>    | *   |
    /// |,-´           |,---´
    /// |              |
    /// ```
    fn join_crossings(&self) -> Option<Vec<LaneMove>> {
        let delta_previous = self.previous_lane - self.current_lane;
        if self.previous_lane < 0 || delta_previous == 0 {
            return None;
        }

        let next_row = self.rows.get(self.current + 1)?;
        let segment = self.rows[self.current].first_parent_or_self(self.segment);
        let next_lane = lane_index(next_row, segment);
        let delta_next = self.current_lane - next_lane;
        if next_lane < 0
            || delta_next.signum() != delta_previous.signum()
            || (delta_next + delta_previous).abs() < 3
            || self.is_previous_lane_diagonal(delta_previous.signum())
        {
            return None;
        }

        // Keep diagonals which continue after the next row
        if self.current + 2 <= self.last_look_ahead {
            let segment = next_row.first_parent_or_self(segment);
            let next_next_lane = lane_index(&self.rows[self.current + 2], segment);
            if next_next_lane >= 0 && next_next_lane == next_lane - delta_next.signum() {
                return None;
            }
        }

        let move_by = if delta_next < 0 {
            -delta_next
        } else {
            delta_previous
        };
        Some(self.move_current(move_by))
    }
}
