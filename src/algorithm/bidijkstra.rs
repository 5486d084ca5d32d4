use super::{join_at_meeting, PathFinder, BACKWARD, FORWARD};
use crate::common::{NodeArena, NodeId, Path, QueueItem};
use crate::env::Environment;
use crate::stat::Stats;

use std::collections::BinaryHeap;
use tracing::{debug, instrument, trace};

type Queue = BinaryHeap<QueueItem>;

pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Bidirectional Dijkstra.
///
/// The forward side grows from `start` along outgoing edges, the backward side
/// from `end` along incoming edges. Every relaxed edge that touches a node
/// labelled by the other side is a candidate connection; the best one is kept
/// as `best`. The search stops once the two queue tops cannot beat `best`
/// (within `epsilon`) or a node is closed by both sides.
pub struct BiDijkstra<'a, E: Environment> {
    env: &'a E,
    epsilon: f64,
    nodes: [NodeArena; 2],
    closedset: Vec<bool>,
    best: f64,
    meeting: Option<NodeId>,
    met: bool,
    stats: Stats,
}

impl<'a, E: Environment> BiDijkstra<'a, E> {
    pub fn new(env: &'a E) -> Self {
        BiDijkstra {
            env,
            epsilon: DEFAULT_EPSILON,
            nodes: [NodeArena::new(env.size()), NodeArena::new(env.size())],
            closedset: vec![false; env.size()],
            best: f64::INFINITY,
            meeting: None,
            met: false,
            stats: Stats::default(),
        }
    }

    /// Tolerance for the stopping test `top_forward + top_backward >= best`.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    fn clear(&mut self) {
        for side in [FORWARD, BACKWARD] {
            for &node in self.nodes[side].touched() {
                self.closedset[node] = false;
            }
            self.nodes[side].clear();
        }
        self.best = f64::INFINITY;
        self.meeting = None;
        self.met = false;
        self.stats = Stats::default();
    }

    // Expands one node of `side`. Returns true once the side has nothing left to expand.
    fn step(&mut self, side: usize, queue: &mut Queue) -> bool {
        let Some(QueueItem { key, node }) = queue.pop() else {
            return true;
        };
        if self.nodes[side].get(node).visited {
            return queue.is_empty();
        }

        trace!("side {side} expands {node} at {key}");
        self.nodes[side].mark_visited(node);
        self.stats.expanded_nodes += 1;

        if self.closedset[node] {
            self.met = true;
            return queue.is_empty();
        }
        self.closedset[node] = true;

        let env = self.env;
        let other = 1 - side;
        let edges = if side == FORWARD {
            env.neighbors(node)
        } else {
            env.predecessors(node)
        };

        for &(next, cost) in edges {
            if self.nodes[side].get(next).visited {
                continue;
            }

            let distance = key + cost;
            if distance < self.nodes[side].get(next).distance_or_inf() {
                self.nodes[side].update(next, Some(node), distance, distance);
                queue.push(QueueItem::new(distance, next));
            }

            if let Some(other_distance) = self.nodes[other].get(next).distance {
                let total = self.nodes[side].get(next).distance_or_inf() + other_distance;
                if total < self.best {
                    self.best = total;
                    self.meeting = Some(next);
                }
            }
        }

        queue.is_empty()
    }
}

impl<E: Environment> PathFinder for BiDijkstra<'_, E> {
    #[instrument(skip(self), name = "bi_dijkstra", level = "debug")]
    fn find_path(&mut self, start: NodeId, end: NodeId) -> Path {
        self.clear();
        if start == end {
            return vec![start];
        }

        let mut queues: [Queue; 2] = [BinaryHeap::new(), BinaryHeap::new()];
        self.nodes[FORWARD].update(start, None, 0.0, 0.0);
        queues[FORWARD].push(QueueItem::new(0.0, start));
        self.nodes[BACKWARD].update(end, None, 0.0, 0.0);
        queues[BACKWARD].push(QueueItem::new(0.0, end));

        while !self.met {
            let (Some(forward_top), Some(backward_top)) = (queues[FORWARD].peek(), queues[BACKWARD].peek()) else {
                break;
            };
            if forward_top.key + backward_top.key + self.epsilon >= self.best {
                break;
            }

            let side = if forward_top.key <= backward_top.key {
                FORWARD
            } else {
                BACKWARD
            };
            if self.step(side, &mut queues[side]) {
                break;
            }
        }

        match self.meeting {
            Some(meeting) => {
                self.stats.costs = self.best;
                join_at_meeting(&self.nodes[FORWARD], &self.nodes[BACKWARD], meeting)
            }
            None => {
                debug!("cannot find path");
                Vec::new()
            }
        }
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    #[test]
    fn test_line_graph() {
        let mut graph = Graph::new(5, false);
        graph
            .add_edges(&[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 4, 1.0)])
            .unwrap();

        let mut search = BiDijkstra::new(&graph);
        assert_eq!(search.find_path(0, 4), vec![0, 1, 2, 3, 4]);
        assert_eq!(search.stats().costs, 4.0);
        assert_eq!(search.find_path(4, 1), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_directed_graph_uses_incoming_edges_backward() {
        let mut graph = Graph::new(4, true);
        graph
            .add_edges(&[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 0, 1.0)])
            .unwrap();

        let mut search = BiDijkstra::new(&graph);
        assert_eq!(search.find_path(2, 1), vec![2, 3, 0, 1]);
        assert_eq!(search.find_path(0, 1), vec![0, 1]);
    }

    #[test]
    fn test_finds_cheaper_long_path() {
        // 0 -10- 1 with a cheap chain 0 - 2 - 3 - 1
        let mut graph = Graph::new(4, false);
        graph
            .add_edges(&[(0, 1, 10.0), (0, 2, 1.0), (2, 3, 1.0), (3, 1, 1.0)])
            .unwrap();

        let mut search = BiDijkstra::new(&graph).with_epsilon(1e-9);
        assert_eq!(search.epsilon(), 1e-9);
        assert_eq!(search.find_path(0, 1), vec![0, 2, 3, 1]);
        assert_eq!(search.stats().costs, 3.0);
    }

    #[test]
    fn test_disconnected_and_trivial() {
        let mut graph = Graph::new(4, false);
        graph.add_edges(&[(0, 1, 1.0), (2, 3, 1.0)]).unwrap();

        let mut search = BiDijkstra::new(&graph);
        assert!(search.find_path(0, 3).is_empty());
        assert_eq!(search.find_path(2, 2), vec![2]);
        // Reused instance is not polluted by the failed query.
        assert_eq!(search.find_path(3, 2), vec![3, 2]);
    }
}
