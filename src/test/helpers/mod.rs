//! Helper functions for building graphs and rows in unit tests

use sha1::{Digest, Sha1};

use crate::graph::{
    LaneInfo, ObjectId, RevisionGraph, RevisionIdx, RowSegment, SegmentIdx, OBJECT_ID_LEN,
};

/// Derives a stable commit id from a readable name
pub fn oid(name: &str) -> ObjectId {
    let digest = Sha1::digest(name.as_bytes());
    let mut bytes = [0_u8; OBJECT_ID_LEN];
    bytes.copy_from_slice(&digest);
    ObjectId::new(bytes)
}

/// Adds `(commit, parents)` pairs in the given order
pub fn add_all(graph: &RevisionGraph, commits: &[(&str, &[&str])]) {
    for (name, parents) in commits {
        let parents: Vec<ObjectId> = parents.iter().map(|parent| oid(parent)).collect();
        graph.add(oid(name), &parents);
    }
}

pub fn rev(index: usize) -> RevisionIdx {
    RevisionIdx(index)
}

/// A row entry for segment `segment` running from revision `child` to revision `parent`
pub fn entry(segment: usize, child: usize, parent: usize) -> RowSegment {
    RowSegment {
        segment: SegmentIdx(segment),
        child: rev(child),
        parent: rev(parent),
        lane_info: LaneInfo {
            color: 0,
            start_revision: rev(child),
        },
    }
}
