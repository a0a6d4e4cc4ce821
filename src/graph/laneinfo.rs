//! Lane colors.

use crate::graph::{revision::RevisionIdx, segment::Segment, store::NodeStore};

/// Visual grouping of a segment: its color and the revision the colored line started at.
///
/// A line keeps its [`LaneInfo`] while it continues through first parents, so one color
/// follows a branch down the graph. New lines pick a color different from the line they
/// derive from and from the line to their left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneInfo {
    /// Index into the palette of the rendering back-end
    pub color: u32,
    /// The revision at which this colored line starts
    pub start_revision: RevisionIdx,
}

impl LaneInfo {
    /// Derives the lane info of a newly started segment.
    ///
    /// Without `derived_from` the segment opens a new line, seeded from both of its ends. With
    /// it, the segment branches off an existing line at its parent.
    pub(crate) fn new(
        store: &NodeStore,
        segment: Segment,
        derived_from: Option<&LaneInfo>,
        left: Option<&LaneInfo>,
        palette: u32,
    ) -> Self {
        let start_revision = if derived_from.is_none() {
            segment.child
        } else {
            segment.parent
        };

        let mut seed = store.revision(start_revision).id().seed();
        if derived_from.is_none() {
            seed ^= store.revision(segment.parent).id().seed();
        }

        let derived_color = derived_from.map(|info| info.color);
        let left_color = left.map(|info| info.color);
        let mut color = seed % palette;
        while Some(color) == derived_color || Some(color) == left_color {
            seed = seed.wrapping_add(1);
            color = seed % palette;
        }

        LaneInfo {
            color,
            start_revision,
        }
    }

    /// The current score of the start revision.
    pub(crate) fn start_score(&self, store: &NodeStore) -> i64 {
        store.revision(self.start_revision).score()
    }
}
