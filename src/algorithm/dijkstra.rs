use super::PathFinder;
use crate::common::{NodeArena, NodeId, Path, QueueItem};
use crate::env::Environment;
use crate::stat::Stats;

use std::collections::BinaryHeap;
use tracing::{debug, instrument};

/// Plain unidirectional Dijkstra, the reference the bidirectional engines are checked against.
pub struct Dijkstra<'a, E: Environment> {
    env: &'a E,
    nodes: NodeArena,
    stats: Stats,
}

impl<'a, E: Environment> Dijkstra<'a, E> {
    pub fn new(env: &'a E) -> Self {
        Dijkstra {
            env,
            nodes: NodeArena::new(env.size()),
            stats: Stats::default(),
        }
    }

    /// Distance of the last path found, `None` if the query failed.
    pub fn distance(&self, node: NodeId) -> Option<f64> {
        self.nodes.get(node).distance
    }
}

impl<E: Environment> PathFinder for Dijkstra<'_, E> {
    #[instrument(skip(self), name = "dijkstra", level = "debug")]
    fn find_path(&mut self, start: NodeId, end: NodeId) -> Path {
        self.nodes.clear();
        self.stats = Stats::default();

        let env = self.env;
        let mut queue = BinaryHeap::new();
        self.nodes.update(start, None, 0.0, 0.0);
        queue.push(QueueItem::new(0.0, start));

        while let Some(QueueItem { key, node }) = queue.pop() {
            if self.nodes.get(node).visited {
                continue;
            }
            self.nodes.mark_visited(node);
            self.stats.expanded_nodes += 1;

            if node == end {
                self.stats.costs = key;
                let mut path = self.nodes.trace_back(end);
                path.reverse();
                return path;
            }

            for &(next, cost) in env.neighbors(node) {
                let distance = key + cost;
                if distance < self.nodes.get(next).distance_or_inf() {
                    self.nodes.update(next, Some(node), distance, distance);
                    queue.push(QueueItem::new(distance, next));
                }
            }
        }

        debug!("cannot find path");
        Vec::new()
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}
