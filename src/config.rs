//! Layout configuration for the revision graph
//!
//! This module provides the switches and window sizes of the heuristic passes that run on
//! top of the topology: crossing reduction and lane straightening. None of them has any
//! influence on which segments a row contains, only on the order and lanes they are drawn in.

use crate::{Error, Result};

/// Configuration of the revision graph layout
///
/// The topology (scores, ordering, the set of segments per row) is always computed. Everything
/// configured here is best-effort visual optimization which can be tuned or turned off for
/// speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct GraphConfig {
    /// Order the segments starting at a revision so that lines reaching their parent sooner,
    /// or merging into / branching from it, get the lanes on the left
    pub reduce_crossings: bool,

    /// Turn multi-lane crossings and one-lane shifts into continuous diagonals
    pub straighten_diagonals: bool,

    /// Pass-through segments heading to the same parent share a single lane
    pub merge_lanes_having_common_parent: bool,

    /// Only the first parent of each commit is linked
    pub only_first_parent: bool,

    /// Number of rows searched for the parent of a segment when reducing crossings (default: 50)
    pub order_segments_look_ahead: usize,

    /// Number of rows examined when straightening lanes (default: 20)
    /// Diagonals are straightened with half of this window
    pub straighten_lanes_look_ahead: usize,

    /// Number of segments per row considered by the straightening passes (default: 40)
    pub max_lanes: usize,

    /// Size of the lane color palette (default: 8, minimum: 3)
    pub lane_color_count: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            reduce_crossings: true,
            straighten_diagonals: true,
            merge_lanes_having_common_parent: true,
            only_first_parent: false,
            order_segments_look_ahead: 50,
            straighten_lanes_look_ahead: 20,
            max_lanes: 40,
            lane_color_count: 8,
        }
    }
}

impl GraphConfig {
    /// Creates a configuration without any visual optimization
    ///
    /// Rows are laid out in the order segments arrive and never straightened. Lane straightening
    /// itself cannot be switched off, but with this configuration it sees no look-ahead rows.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            reduce_crossings: false,
            straighten_diagonals: false,
            merge_lanes_having_common_parent: false,
            only_first_parent: false,
            order_segments_look_ahead: 0,
            straighten_lanes_look_ahead: 0,
            max_lanes: 40,
            lane_color_count: 8,
        }
    }

    /// Creates a configuration with every optimization enabled
    #[must_use]
    pub fn comprehensive() -> Self {
        Self::default()
    }

    /// Number of look-ahead rows used for straightening diagonals
    #[must_use]
    pub fn straighten_diagonals_look_ahead(&self) -> usize {
        if self.straighten_diagonals {
            self.straighten_lanes_look_ahead / 2
        } else {
            0
        }
    }

    /// Number of rows withheld at the frontier while their straightening is still in progress
    #[must_use]
    pub fn straighten_look_ahead(&self) -> usize {
        2 * (self.straighten_diagonals_look_ahead() + self.straighten_lanes_look_ahead)
    }

    /// Checks the configuration for values the layout cannot work with
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the palette has fewer than 3 colors (a lane must
    /// differ from both its left neighbour and the lane it derives from), if `max_lanes` is zero
    /// or if crossing reduction is enabled without a look-ahead window.
    pub fn validate(&self) -> Result<()> {
        if self.lane_color_count < 3 {
            return Err(Error::InvalidConfig(format!(
                "lane_color_count must be at least 3, got {}",
                self.lane_color_count
            )));
        }

        if self.max_lanes == 0 {
            return Err(Error::InvalidConfig(
                "max_lanes must not be zero".to_string(),
            ));
        }

        if self.reduce_crossings && self.order_segments_look_ahead == 0 {
            return Err(Error::InvalidConfig(
                "reduce_crossings requires a non-zero order_segments_look_ahead".to_string(),
            ));
        }

        Ok(())
    }
}
