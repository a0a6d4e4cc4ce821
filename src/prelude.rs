//! # revgraph Prelude
//!
//! The types needed to feed commits into a [`RevisionGraph`] and read laid out rows back.
//! Import everything with `use revgraph::prelude::*;`.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all revgraph operations
pub use crate::Error;

/// The result type used throughout revgraph
pub use crate::Result;

/// Layout switches and window sizes
pub use crate::GraphConfig;

// ================================================================================================
// Main Entry Point
// ================================================================================================

/// The layout engine facade
pub use crate::graph::{GraphState, RevisionGraph, UpdateListener};

// ================================================================================================
// Input
// ================================================================================================

/// Commit identification and artificial row placement
pub use crate::graph::{Insertion, ObjectId};

// ================================================================================================
// Layout Output
// ================================================================================================

/// Laid out rows and their lanes
pub use crate::graph::{Lane, LaneInfo, LaneSharing, Row, RowSegment, Rows};

/// Revisions and segments referenced by rows
pub use crate::graph::{Revision, RevisionFlags, RevisionIdx, Segment, SegmentIdx};
