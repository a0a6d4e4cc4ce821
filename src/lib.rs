// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![allow(clippy::too_many_arguments)]

//! # revgraph
//!
//! An incremental, thread-safe layout engine for commit graphs, as drawn next to the commit
//! list of a history viewer. Commits stream in while the history is still being read; the
//! engine orders them topologically, assigns every line between a commit and its parent a
//! lane in each row it crosses and keeps the picture calm by reducing crossings and removing
//! zig-zags.
//!
//! ## Features
//!
//! - **Streaming input** - Commits may arrive in any order, parents before or after children
//! - **Lazy rows** - Rows are built only as far as a viewer asks for them
//! - **Lock-light reads** - Readers work on immutable snapshots while a producer adds commits
//! - **Stable colors** - A branch keeps its color while it continues through first parents
//! - **Artificial rows** - Working tree and index rows can be inserted in front of a commit
//!
//! ## Quick Start
//!
//! ```rust
//! use revgraph::prelude::*;
//!
//! let root: ObjectId = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".parse()?;
//! let feature: ObjectId = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".parse()?;
//! let main: ObjectId = "cccccccccccccccccccccccccccccccccccccccc".parse()?;
//! let merge: ObjectId = "dddddddddddddddddddddddddddddddddddddddd".parse()?;
//!
//! let graph = RevisionGraph::new();
//! graph.add(merge, &[main, feature]);
//! graph.add(main, &[root]);
//! graph.add(feature, &[root]);
//! graph.add(root, &[]);
//! graph.loading_completed();
//!
//! graph.ensure_rows_built(3);
//! for index in 0..graph.cached_count() {
//!     let row = graph.row(index).unwrap();
//!     println!(
//!         "{} in lane {} of {}",
//!         graph.revision(row.revision()).id().to_short_string(),
//!         row.revision_lane(),
//!         row.lane_count()
//!     );
//! }
//! # Ok::<(), revgraph::Error>(())
//! ```
//!
//! ## Threading
//!
//! [`RevisionGraph`] is `Send + Sync`. One thread adds commits, any number of threads query
//! rows through a shared reference. Lookups are backed by [`dashmap`], the revision arenas by
//! [`boxcar`] and every cache is published as an `Arc` snapshot which stays valid for as long
//! as a reader holds it.
//!
//! ## Error Handling
//!
//! Layout queries are infallible: rows not built yet and unknown ids are reported as `None`.
//! [`Error`] covers input validation and the brute-force checks
//! [`RevisionGraph::validate_topo_order`] and [`RevisionGraph::validate_rows`].
//!
//! ```rust
//! use revgraph::{Error, GraphConfig, RevisionGraph};
//!
//! let config = GraphConfig { lane_color_count: 1, ..GraphConfig::default() };
//! match RevisionGraph::with_config(config) {
//!     Ok(_) => unreachable!(),
//!     Err(Error::InvalidConfig(message)) => println!("rejected: {message}"),
//!     Err(e) => println!("other error: {e}"),
//! }
//! ```
//!
//! ## Logging
//!
//! Cache rebuilds and lost races are reported through the [`log`] facade at `debug` and
//! `trace` level. Install any logger to see them.
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use revgraph::prelude::*;
///
/// let graph = RevisionGraph::with_config(GraphConfig::minimal())?;
/// graph.add(ObjectId::new([1; 20]), &[]);
/// assert_eq!(graph.state(), GraphState::Loading);
/// # Ok::<(), revgraph::Error>(())
/// ```
pub mod prelude;

/// Layout switches and window sizes
pub mod config;

/// The revision graph and its layout passes
///
/// # Key Types
///
/// - [`RevisionGraph`] - The facade commits are added to and rows are read from
/// - [`graph::NodeStore`] - Revisions, segments and their scores
/// - [`graph::Row`] - One laid out row with the lane of every segment crossing it
/// - [`graph::LaneInfo`] - Color and origin of a line
pub mod graph;

/// `revgraph` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `revgraph` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

pub use config::GraphConfig;
pub use graph::{GraphState, Insertion, ObjectId, RevisionGraph};
