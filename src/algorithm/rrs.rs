use crate::common::{NodeArena, NodeId, QueueItem};
use crate::env::Environment;

use std::collections::BinaryHeap;
use tracing::trace;

/// Backward Dijkstra from a fixed goal that only runs as far as queries need.
///
/// Every `distance` call resumes the frontier left by earlier calls until the
/// queried node is closed, so repeated queries against one instance share
/// their work. A fresh instance is the only way to restart.
pub struct ReverseResumableSearch<'a, E: Environment> {
    env: &'a E,
    goal: NodeId,
    nodes: NodeArena,
    queue: BinaryHeap<QueueItem>,
    expanded: usize,
}

impl<'a, E: Environment> ReverseResumableSearch<'a, E> {
    pub fn new(env: &'a E, goal: NodeId) -> Self {
        let mut nodes = NodeArena::new(env.size());
        nodes.update(goal, None, 0.0, 0.0);
        let mut queue = BinaryHeap::new();
        queue.push(QueueItem::new(0.0, goal));

        ReverseResumableSearch {
            env,
            goal,
            nodes,
            queue,
            expanded: 0,
        }
    }

    pub fn goal(&self) -> NodeId {
        self.goal
    }

    /// Number of nodes closed so far.
    pub fn expanded(&self) -> usize {
        self.expanded
    }

    /// Exact distance from `node` to the goal, infinite if the goal is unreachable.
    pub fn distance(&mut self, node: NodeId) -> f64 {
        if self.nodes.get(node).visited {
            return self.nodes.get(node).distance_or_inf();
        }

        let env = self.env;
        while let Some(QueueItem { key, node: current }) = self.queue.pop() {
            if self.nodes.get(current).visited {
                continue;
            }
            self.nodes.mark_visited(current);
            self.expanded += 1;

            for &(previous, cost) in env.predecessors(current) {
                let distance = key + cost;
                if !self.nodes.get(previous).visited && distance < self.nodes.get(previous).distance_or_inf() {
                    self.nodes.update(previous, Some(current), distance, distance);
                    self.queue.push(QueueItem::new(distance, previous));
                }
            }

            if current == node {
                trace!("goal {} distance to {node}: {key}", self.goal);
                return key;
            }
        }

        f64::INFINITY
    }
}
