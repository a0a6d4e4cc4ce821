//! The revision graph layout engine.
//!
//! [`RevisionGraph`] ingests commits one at a time, in any order, and lays them out as rows of
//! lanes for a `git log --graph` style view. The work is split into layers:
//!
//! - [`store`]: revisions, segments and scores ([`NodeStore`])
//! - [`ordering`]: score-sorted snapshots of the revisions ([`OrderedNodes`])
//! - [`builder`]: the row cache, built incrementally from the ordering
//! - [`crossing`]: lane order of the segments leaving a revision
//! - [`straighten`]: removal of zig-zags from built rows
//!
//! Only the first three define the topology. Crossing reduction and straightening are
//! best-effort visual passes which reorder and move lanes but never add or drop a segment.
//!
//! # Threading
//!
//! One producer calls [`RevisionGraph::add`] while any number of consumers query rows. Both
//! sides only need `&RevisionGraph`; share it through an [`std::sync::Arc`]. Caches are rebuilt
//! by the querying thread, up to what it asked for, and published as immutable snapshots.
//!
//! # Examples
//!
//! ```rust
//! use revgraph::{ObjectId, RevisionGraph};
//!
//! let c1 = ObjectId::new([1; 20]);
//! let c2 = ObjectId::new([2; 20]);
//!
//! let graph = RevisionGraph::new();
//! graph.add(c2, &[c1]);
//! graph.add(c1, &[]);
//! graph.loading_completed();
//!
//! graph.ensure_rows_built(1);
//! let row = graph.row(0).unwrap();
//! assert_eq!(graph.revision(row.revision()).id(), c2);
//! assert_eq!(graph.cached_count(), 2);
//! ```

pub mod builder;
pub mod crossing;
pub mod laneinfo;
pub mod objectid;
pub mod ordering;
pub mod revision;
pub mod row;
pub mod segment;
pub mod store;
pub mod straighten;
pub mod validate;

pub use builder::Rows;
pub use laneinfo::LaneInfo;
pub use objectid::{ObjectId, OBJECT_ID_LEN};
pub use ordering::OrderedNodes;
pub use revision::{Revision, RevisionFlags, RevisionIdx};
pub use row::{Lane, LaneSharing, Row, RowSegment};
pub use segment::{Segment, SegmentIdx};
pub use store::{Insertion, NodeStore};

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use strum::{Display, EnumIter};

use crate::{
    config::GraphConfig,
    graph::{builder::RowCache, ordering::OrderingCache},
    Result,
};

/// Rows rebuilt right away when an artificial row is placed in front of existing rows.
const ARTIFICIAL_ROWS_REFRESH: usize = 99;

/// Loading state of a [`RevisionGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum GraphState {
    /// No revision was added yet
    Empty,
    /// Revisions are streaming in, rows near the end are withheld
    Loading,
    /// All revisions arrived, every built row is final
    LoadingCompleted,
}

/// Callback invoked whenever a new set of rows was published.
pub type UpdateListener = Box<dyn Fn() + Send + Sync>;

/// The layout engine facade.
///
/// Coordinates the node store, the ordering and the row cache. See the [module
/// documentation](self) for an overview.
pub struct RevisionGraph {
    store: NodeStore,
    ordering: OrderingCache,
    rows: RowCache,
    config: GraphConfig,
    loading_completed: AtomicBool,
    head_id: Option<ObjectId>,
    listener: Option<UpdateListener>,
}

impl Default for RevisionGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RevisionGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionGraph")
            .field("count", &self.count())
            .field("state", &self.state())
            .field("config", &self.config)
            .field("head_id", &self.head_id)
            .finish_non_exhaustive()
    }
}

impl RevisionGraph {
    /// Creates an empty graph with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(GraphConfig::default())
    }

    /// Creates an empty graph with a custom configuration.
    ///
    /// # Arguments
    /// * `config` - Switches and window sizes of the layout heuristics
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConfig`] if `config` fails [`GraphConfig::validate`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use revgraph::{GraphConfig, RevisionGraph};
    ///
    /// let graph = RevisionGraph::with_config(GraphConfig::minimal())?;
    /// assert_eq!(graph.count(), 0);
    /// # Ok::<(), revgraph::Error>(())
    /// ```
    pub fn with_config(config: GraphConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: GraphConfig) -> Self {
        RevisionGraph {
            store: NodeStore::new(),
            ordering: OrderingCache::new(),
            rows: RowCache::new(),
            config,
            loading_completed: AtomicBool::new(false),
            head_id: None,
            listener: None,
        }
    }

    /// The layout configuration.
    #[must_use]
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Drops all revisions and cached rows.
    pub fn clear(&mut self) {
        self.store = NodeStore::new();
        self.ordering.clear();
        self.rows.clear();
        self.loading_completed.store(false, Ordering::Release);
    }

    /// Sets the id of the checked out commit.
    ///
    /// Applies to revisions whose data arrives afterwards.
    pub fn set_head_id(&mut self, head_id: Option<ObjectId>) {
        self.head_id = head_id;
    }

    /// The id of the checked out commit.
    #[must_use]
    pub fn head_id(&self) -> Option<ObjectId> {
        self.head_id
    }

    /// Registers a callback invoked after new rows were published.
    ///
    /// The callback runs on the thread which built the rows.
    pub fn set_update_listener<F>(&mut self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    /// Signals that no more commits will arrive.
    ///
    /// Rows up to the last one can now be built and straightened completely.
    pub fn loading_completed(&self) {
        self.loading_completed.store(true, Ordering::Release);
    }

    /// Whether [`RevisionGraph::loading_completed`] was called.
    #[must_use]
    pub fn is_loading_completed(&self) -> bool {
        self.loading_completed.load(Ordering::Acquire)
    }

    /// The loading state.
    #[must_use]
    pub fn state(&self) -> GraphState {
        if self.is_loading_completed() {
            GraphState::LoadingCompleted
        } else if self.store.count() == 0 {
            GraphState::Empty
        } else {
            GraphState::Loading
        }
    }

    /// Number of revisions whose data arrived.
    ///
    /// Parents referenced but not loaded yet are not counted.
    #[must_use]
    pub fn count(&self) -> usize {
        self.store.count()
    }

    /// Adds one commit and links it to its parents.
    ///
    /// Commits may arrive in any order. A commit seen as a parent before is moved behind all
    /// commits added so far; parents not seen yet are created as placeholders. Duplicate parent
    /// ids and a commit listing itself as its parent are ignored.
    ///
    /// # Arguments
    /// * `id` - The commit id
    /// * `parents` - The parent ids, first parent first
    pub fn add(&self, id: ObjectId, parents: &[ObjectId]) {
        self.add_revision(id, parents, None);
    }

    /// Adds an artificial commit in front of an existing row.
    ///
    /// All revisions scored below `insertion.score` move down by `insertion.range` and the new
    /// revision takes the freed score right in front of the revision with that score. Its new
    /// parents are placed in the gap as well. Used for the working tree and index rows shown
    /// in front of the checked out commit.
    ///
    /// If `id` is already present, its reserved score is kept, no parent edges are created
    /// and the first rows are rebuilt right away.
    ///
    /// # Arguments
    /// * `id` - The commit id, usually [`ObjectId::WORK_TREE`] or [`ObjectId::INDEX`]
    /// * `parents` - The parent ids
    /// * `insertion` - Where to insert and how many scores to reserve
    ///
    /// # Examples
    ///
    /// ```rust
    /// use revgraph::{Insertion, ObjectId, RevisionGraph};
    ///
    /// let head = ObjectId::new([7; 20]);
    /// let graph = RevisionGraph::new();
    /// graph.add(head, &[]);
    ///
    /// let score = graph.revision(graph.revision_index(&head).unwrap()).score();
    /// let insertion = Insertion { score, range: 2 };
    /// graph.add_inserted(ObjectId::WORK_TREE, &[ObjectId::INDEX], insertion);
    /// graph.add_inserted(ObjectId::INDEX, &[head], insertion);
    ///
    /// assert_eq!(graph.try_get_row_index(&ObjectId::WORK_TREE), Some(0));
    /// assert_eq!(graph.try_get_row_index(&ObjectId::INDEX), Some(1));
    /// assert_eq!(graph.try_get_row_index(&head), Some(2));
    /// ```
    pub fn add_inserted(&self, id: ObjectId, parents: &[ObjectId], insertion: Insertion) {
        self.add_revision(id, parents, Some(insertion));
    }

    fn add_revision(&self, id: ObjectId, parents: &[ObjectId], insertion: Option<Insertion>) {
        let added = self
            .store
            .add(id, parents, insertion, self.config.only_first_parent);

        if self.head_id == Some(id) {
            self.store
                .revision(added.index)
                .set_flag(RevisionFlags::CHECKED_OUT);
        }

        if !added.parents_linked {
            // Rows in front of the insertion point may be built already
            self.store.tracking.reorder.store(true, Ordering::Release);
            self.cache_to(0, ARTIFICIAL_ROWS_REFRESH);
        }
    }

    /// Whether `id` is known, loaded or referenced as a parent.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.store.index_of(id).is_some()
    }

    /// The index of the revision of `id`, loaded or referenced as a parent.
    #[must_use]
    pub fn revision_index(&self, id: &ObjectId) -> Option<RevisionIdx> {
        self.store.index_of(id)
    }

    /// The revision at `index`.
    ///
    /// # Panics
    /// Panics if `index` was not handed out by this graph since it was last cleared.
    #[must_use]
    pub fn revision(&self, index: RevisionIdx) -> &Revision {
        self.store.revision(index)
    }

    /// The segment at `index`.
    ///
    /// # Panics
    /// Panics if `index` was not handed out by this graph since it was last cleared.
    #[must_use]
    pub fn segment(&self, index: SegmentIdx) -> Segment {
        self.store.segment(index)
    }

    /// The underlying node store.
    #[must_use]
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Returns revisions sorted by score, valid at least through row `up_to`.
    ///
    /// Re-sorts if a score changed since the last call or fewer rows were sorted than asked
    /// for; otherwise returns the same snapshot again.
    #[must_use]
    pub fn ordered_nodes(&self, up_to: usize) -> Arc<OrderedNodes> {
        self.ordering.get(&self.store, up_to)
    }

    /// The revision shown at `row`, available before the row is laid out.
    #[must_use]
    pub fn node_for_row(&self, row: usize) -> Option<&Revision> {
        self.ordered_nodes(row)
            .get(row)
            .map(|index| self.store.revision(index))
    }

    /// The row at which `id` is shown.
    #[must_use]
    pub fn try_get_row_index(&self, id: &ObjectId) -> Option<usize> {
        let index = self.store.index_of(id)?;
        self.ordered_nodes(self.count()).position(index)
    }

    /// Builds rows so that rows `current..=last` can be shown.
    ///
    /// Rows are built a straightening look-ahead further than asked for. While loading, rows
    /// close to the end of the ordering are not built yet if crossing reduction still needs
    /// revisions after them.
    ///
    /// # Arguments
    /// * `current` - The first row to be shown
    /// * `last` - The last row to be shown
    pub fn cache_to(&self, current: usize, last: usize) {
        let look_ahead = self.config.straighten_look_ahead();
        let mut last = last.max(current).saturating_add(look_ahead);

        let completed = self.is_loading_completed();
        if completed {
            last = last.min(self.count().saturating_sub(1));
        }

        let ordered = self.ordering.get(&self.store, last);
        if self
            .rows
            .build(&self.store, &ordered, &self.config, last, completed)
        {
            if let Some(listener) = &self.listener {
                listener();
            }
        }
    }

    /// Builds rows through `through`.
    pub fn ensure_rows_built(&self, through: usize) {
        self.cache_to(through, through);
    }

    /// The laid out row at `index`, if it is built.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<Arc<Row>> {
        self.rows.current()?.get(index).cloned()
    }

    /// All built rows.
    #[must_use]
    pub fn rows(&self) -> Option<Arc<Rows>> {
        self.rows.current()
    }

    /// Number of rows which are built and will not change anymore.
    ///
    /// While loading, or before every row is built, the rows straightening may still touch are
    /// not counted.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.rows.cached_count(
            self.count(),
            self.is_loading_completed(),
            self.config.straighten_look_ahead(),
        )
    }

    /// Highlights `id` and all its ancestors as relatives.
    ///
    /// The previous highlighting is cleared first. Parents linked to a relative later become
    /// relatives too.
    pub fn highlight_branch(&self, id: &ObjectId) {
        self.store.clear_relatives();
        if let Some(index) = self.store.index_of(id) {
            self.store.make_relative(index);
        }
    }

    /// Whether the revision shown at `row` is highlighted.
    #[must_use]
    pub fn is_row_relative(&self, row: usize) -> bool {
        self.node_for_row(row).is_some_and(Revision::is_relative)
    }

    /// Whether the revision of `id` is highlighted.
    #[must_use]
    pub fn is_revision_relative(&self, id: &ObjectId) -> bool {
        self.store
            .index_of(id)
            .is_some_and(|index| self.store.revision(index).is_relative())
    }

    /// Verifies the topological order of all scores.
    ///
    /// # Errors
    /// Returns [`crate::Error::TopologyViolation`] for an edge whose parent is not scored
    /// above its child.
    pub fn validate_topo_order(&self) -> Result<()> {
        self.store.validate_topo_order()
    }

    /// Verifies row continuity and lane uniqueness of the built rows.
    ///
    /// Once loading has completed and every row is built, the last row is checked for lines
    /// running on to loaded revisions as well.
    ///
    /// # Errors
    /// Returns [`crate::Error::LayoutViolation`] for the first broken row.
    pub fn validate_rows(&self) -> Result<()> {
        match self.rows.current() {
            Some(rows) => {
                let all_rows = self.is_loading_completed() && rows.len() == self.count();
                validate::validate_rows(&self.store, &rows, all_rows)
            }
            None => Ok(()),
        }
    }
}
