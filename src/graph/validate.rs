//! Brute-force checks of laid out rows.
//!
//! Used by tests and when debugging a layout; nothing on the query path calls these.

use std::{collections::HashSet, sync::Arc};

use rayon::prelude::*;

use crate::{
    graph::{
        row::{LaneSharing, Row},
        store::NodeStore,
    },
    Error, Result,
};

/// Checks row continuity and lane uniqueness of `rows`.
///
/// - row 0 only contains segments starting at its revision
/// - every segment of a row which does not end at its revision is present in the next row
/// - within a row, no two segments with an exclusive or primary lane share a lane index
/// - with `all_rows` set, the last row passes no segment on to a loaded parent, since that
///   parent would need a row below it
///
/// `all_rows` must only be set when loading has completed and `rows` covers every revision.
///
/// # Errors
/// Returns [`Error::LayoutViolation`] for the first offending row found.
pub fn validate_rows(store: &NodeStore, rows: &[Arc<Row>], all_rows: bool) -> Result<()> {
    if let Some(first) = rows.first() {
        if let Some(entry) = first
            .segments()
            .iter()
            .find(|entry| entry.child != first.revision())
        {
            return Err(Error::LayoutViolation {
                row: 0,
                message: format!("segment {} passes through the first row", entry.segment.index()),
            });
        }
    }

    if let Some(last) = rows.last().filter(|_| all_rows) {
        let revision = last.revision();
        if let Some(entry) = last.segments().iter().find(|entry| {
            entry.child != revision
                && entry.parent != revision
                && store.revision(entry.parent).is_completed()
        }) {
            return Err(Error::LayoutViolation {
                row: rows.len() - 1,
                message: format!(
                    "segment {} passes through the last row to a loaded parent",
                    entry.segment.index()
                ),
            });
        }
    }

    rows.par_iter().enumerate().try_for_each(|(index, row)| {
        check_lanes(index, row)?;
        match rows.get(index + 1) {
            Some(next) => check_continuity(index, row, next),
            None => Ok(()),
        }
    })
}

fn check_lanes(index: usize, row: &Row) -> Result<()> {
    let mut used = HashSet::new();
    for (entry, lane) in row.segment_lanes() {
        if lane.sharing == LaneSharing::ExclusiveOrPrimary && !used.insert(lane.index) {
            return Err(Error::LayoutViolation {
                row: index,
                message: format!(
                    "segment {} takes lane {} which is already in use",
                    entry.segment.index(),
                    lane.index
                ),
            });
        }
    }
    Ok(())
}

fn check_continuity(index: usize, row: &Row, next: &Row) -> Result<()> {
    for entry in row.segments() {
        if entry.parent != row.revision() && next.get(entry.segment).is_none() {
            return Err(Error::LayoutViolation {
                row: index + 1,
                message: format!(
                    "segment {} continuing from row {} is missing",
                    entry.segment.index(),
                    index
                ),
            });
        }
    }
    Ok(())
}
