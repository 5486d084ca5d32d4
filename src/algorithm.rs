mod astar;
mod biastar;
mod bidijkstra;
mod dijkstra;
mod rrs;

pub use astar::SpaceTimeAStar;
pub use biastar::BiAStar;
pub use bidijkstra::{BiDijkstra, DEFAULT_EPSILON};
pub use dijkstra::Dijkstra;
pub use rrs::ReverseResumableSearch;

use std::collections::HashMap;

use crate::common::{NodeArena, NodeId, Path};
use crate::stat::Stats;

/// Single-agent, single-pair shortest path search.
pub trait PathFinder {
    /// Empty path if `end` cannot be reached from `start`.
    ///
    /// # Panics
    ///
    /// If `start` or `end` is not a node of the environment.
    fn find_path(&mut self, start: NodeId, end: NodeId) -> Path;

    fn stats(&self) -> &Stats;
}

pub(crate) const FORWARD: usize = 0;
pub(crate) const BACKWARD: usize = 1;

type Trace = HashMap<(NodeId, usize), (NodeId, usize)>;

fn construct_path(trace: &Trace, mut current: (NodeId, usize)) -> Path {
    let mut path = vec![current.0];
    while let Some(&(node, time)) = trace.get(&current) {
        path.push(node);
        current = (node, time);
    }
    path.reverse();
    path
}

// Joins the forward tree (meeting -> start) with the backward tree (meeting -> end).
fn join_at_meeting(forward: &NodeArena, backward: &NodeArena, meeting: NodeId) -> Path {
    let mut path = forward.trace_back(meeting);
    path.reverse();
    path.extend(backward.trace_back(meeting).into_iter().skip(1));
    path
}
