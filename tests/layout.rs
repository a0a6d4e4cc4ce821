//! Layout integration tests.
//!
//! These tests drive the public API the way a history viewer does:
//! 1. Stream commits into a `RevisionGraph`
//! 2. Signal the end of the log
//! 3. Build and read rows
//! 4. Verify ordering, topology and the row invariants

use std::collections::HashSet;

use revgraph::{
    graph::{LaneSharing, RevisionIdx},
    GraphConfig, GraphState, Insertion, ObjectId, Result, RevisionGraph,
};

/// Stable id for a small test number.
fn id(n: u8) -> ObjectId {
    let mut bytes = [0xA0; 20];
    bytes[0] = n;
    ObjectId::new(bytes)
}

fn index(graph: &RevisionGraph, n: u8) -> RevisionIdx {
    graph
        .revision_index(&id(n))
        .expect("revision should be known")
}

fn score(graph: &RevisionGraph, n: u8) -> i64 {
    graph.revision(index(graph, n)).score()
}

fn ordered_ids(graph: &RevisionGraph) -> Vec<ObjectId> {
    graph
        .ordered_nodes(graph.count())
        .iter()
        .map(|revision| graph.revision(revision).id())
        .collect()
}

#[test]
fn test_parent_loaded_first_is_ordered_after_child() -> Result<()> {
    let graph = RevisionGraph::new();
    graph.add(id(1), &[]);
    graph.add(id(2), &[id(1)]);
    graph.loading_completed();

    assert_eq!(ordered_ids(&graph), vec![id(2), id(1)]);

    graph.ensure_rows_built(1);
    let row = graph.row(0).expect("row 0 should be built");
    assert_eq!(row.revision(), index(&graph, 2));
    assert_eq!(row.segments().len(), 1);
    assert_eq!(row.segments()[0].parent, index(&graph, 1));

    let row = graph.row(1).expect("row 1 should be built");
    assert_eq!(row.revision(), index(&graph, 1));
    assert_eq!(row.segments()[0].parent, row.revision());

    graph.validate_topo_order()?;
    graph.validate_rows()
}

#[test]
fn test_out_of_order_insertion() -> Result<()> {
    let graph = RevisionGraph::new();
    graph.add(id(2), &[id(1)]);
    assert_eq!(graph.count(), 1);
    assert!(graph.contains(&id(1)));

    graph.add(id(1), &[]);
    assert_eq!(graph.count(), 2);
    assert!(score(&graph, 1) > score(&graph, 2));
    graph.validate_topo_order()
}

#[test]
fn test_merge_ordered_before_parents_in_any_arrival_order() -> Result<()> {
    for parents_first in [false, true] {
        let graph = RevisionGraph::new();
        if parents_first {
            graph.add(id(2), &[]);
            graph.add(id(1), &[]);
            graph.add(id(3), &[id(1), id(2)]);
        } else {
            graph.add(id(3), &[id(1), id(2)]);
            graph.add(id(2), &[]);
            graph.add(id(1), &[]);
        }

        let ordered = ordered_ids(&graph);
        assert_eq!(ordered.len(), 3);
        assert_eq!(ordered[0], id(3));
        assert!(score(&graph, 3) < score(&graph, 1));
        assert!(score(&graph, 3) < score(&graph, 2));
        graph.validate_topo_order()?;
    }
    Ok(())
}

#[test]
fn test_reordering_is_idempotent() {
    let graph = RevisionGraph::new();
    graph.add(id(4), &[id(3)]);
    graph.add(id(3), &[id(1), id(2)]);
    graph.add(id(2), &[id(1)]);
    graph.add(id(1), &[]);

    let first = graph.ordered_nodes(10);
    let second = graph.ordered_nodes(10);
    assert_eq!(first.as_slice(), second.as_slice());
}

#[test]
fn test_synthetic_rows_reserve_a_gap() -> Result<()> {
    let mut graph = RevisionGraph::new();
    graph.set_head_id(Some(id(2)));
    graph.add(id(1), &[id(2)]);
    graph.add(id(2), &[id(3)]);
    graph.add(id(3), &[]);

    let before: Vec<(ObjectId, i64)> = graph
        .store()
        .revisions()
        .map(|(_, revision)| (revision.id(), revision.score()))
        .collect();

    let head_score = score(&graph, 2);
    let insertion = Insertion {
        score: head_score,
        range: 2,
    };
    graph.add_inserted(ObjectId::WORK_TREE, &[ObjectId::INDEX], insertion);
    graph.add_inserted(ObjectId::INDEX, &[id(2)], insertion);

    for (commit, previous) in before {
        let current = graph.revision(graph.revision_index(&commit).unwrap()).score();
        if previous < head_score {
            assert_eq!(current, previous - 2);
        } else {
            assert_eq!(current, previous);
        }
    }

    let scores: HashSet<i64> = graph
        .store()
        .revisions()
        .map(|(_, revision)| revision.score())
        .collect();
    assert_eq!(scores.len(), graph.store().revision_count());

    assert_eq!(
        ordered_ids(&graph),
        vec![id(1), ObjectId::WORK_TREE, ObjectId::INDEX, id(2), id(3)]
    );
    assert!(graph.revision(index(&graph, 2)).is_checked_out());
    graph.validate_topo_order()
}

#[test]
fn test_work_tree_above_read_ordering_becomes_first_row() -> Result<()> {
    let graph = RevisionGraph::new();
    graph.add(id(2), &[id(1)]);
    graph.add(id(1), &[]);
    assert_eq!(ordered_ids(&graph), vec![id(2), id(1)]);

    let insertion = Insertion {
        score: score(&graph, 2),
        range: 1,
    };
    graph.add_inserted(ObjectId::WORK_TREE, &[id(2)], insertion);

    let first = graph.node_for_row(0).map(|revision| revision.id());
    assert_eq!(first, Some(ObjectId::WORK_TREE));
    assert_eq!(
        ordered_ids(&graph),
        vec![ObjectId::WORK_TREE, id(2), id(1)]
    );
    graph.validate_topo_order()
}

#[test]
fn test_merge_lanes() -> Result<()> {
    // 4 merges 3 and 2, both branching from 1
    let graph = RevisionGraph::with_config(GraphConfig::minimal())?;
    graph.add(id(4), &[id(3), id(2)]);
    graph.add(id(3), &[id(1)]);
    graph.add(id(2), &[id(1)]);
    graph.add(id(1), &[]);
    graph.loading_completed();
    graph.ensure_rows_built(3);

    assert_eq!(graph.cached_count(), 4);
    let merge = graph.row(0).unwrap();
    assert_eq!(merge.segments().len(), 2);
    assert_eq!(merge.revision_lane(), 0);
    assert_eq!(merge.lane_count(), 1);

    // The second parent keeps its own lane until it reaches the fork point
    let second = graph.row(1).unwrap();
    assert_eq!(second.lane_count(), 2);

    let root = graph.row(3).unwrap();
    assert_eq!(root.revision(), index(&graph, 1));
    assert_eq!(root.revision_lane(), 0);
    let ending: Vec<LaneSharing> = root
        .segment_lanes()
        .filter(|(segment, _)| segment.parent == root.revision())
        .map(|(_, lane)| lane.sharing)
        .collect();
    assert_eq!(
        ending,
        vec![LaneSharing::ExclusiveOrPrimary, LaneSharing::DifferentStart]
    );

    graph.validate_rows()
}

#[test]
fn test_rows_follow_late_parents() -> Result<()> {
    let graph = RevisionGraph::with_config(GraphConfig::minimal())?;
    graph.add(id(3), &[id(2)]);
    graph.add(id(1), &[]);
    graph.ensure_rows_built(10);
    assert_eq!(graph.rows().map(|rows| rows.len()), Some(2));

    // 2 turns out to sit between 3 and 1
    graph.add(id(2), &[id(1)]);
    graph.loading_completed();
    graph.ensure_rows_built(10);

    let rows = graph.rows().unwrap();
    let revisions: Vec<RevisionIdx> = rows.iter().map(|row| row.revision()).collect();
    assert_eq!(
        revisions,
        vec![index(&graph, 3), index(&graph, 2), index(&graph, 1)]
    );
    graph.validate_topo_order()?;
    graph.validate_rows()
}

#[test]
fn test_queries_beyond_known_rows() {
    let graph = RevisionGraph::new();
    assert_eq!(graph.state(), GraphState::Empty);
    assert!(graph.row(0).is_none());
    assert!(graph.node_for_row(0).is_none());
    assert_eq!(graph.try_get_row_index(&id(9)), None);
    assert_eq!(graph.cached_count(), 0);

    graph.add(id(1), &[]);
    graph.loading_completed();
    graph.ensure_rows_built(1_000);
    assert_eq!(graph.cached_count(), 1);
    assert!(graph.row(1).is_none());
}

#[test]
fn test_comprehensive_layout_of_long_history() -> Result<()> {
    let graph = RevisionGraph::with_config(GraphConfig::comprehensive())?;

    // A main line with a side branch merged every ten commits
    for n in 0..200u8 {
        let parent = id(n + 1);
        if n % 10 == 0 && n + 5 < 200 {
            let side = {
                let mut bytes = [0xB0; 20];
                bytes[0] = n;
                ObjectId::new(bytes)
            };
            graph.add(id(n), &[parent, side]);
            graph.add(side, &[id(n + 5)]);
        } else {
            graph.add(id(n), &[parent]);
        }
    }
    graph.add(id(200), &[]);
    graph.loading_completed();

    graph.ensure_rows_built(graph.count());
    assert_eq!(graph.cached_count(), graph.count());
    graph.validate_topo_order()?;
    graph.validate_rows()?;

    for index in 0..graph.count() {
        let row = graph.row(index).unwrap();
        let shown = graph.node_for_row(index).map(|revision| revision.id());
        assert_eq!(shown, Some(graph.revision(row.revision()).id()));
        assert!(row.revision_lane() < row.lane_count());
    }
    Ok(())
}
