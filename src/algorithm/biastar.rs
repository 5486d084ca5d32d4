use super::{join_at_meeting, PathFinder, BACKWARD, FORWARD};
use crate::common::{NodeArena, NodeId, Path, QueueItem};
use crate::env::Environment;
use crate::stat::Stats;

use std::collections::BinaryHeap;
use tracing::{debug, instrument, trace};

type Queue = BinaryHeap<QueueItem>;

/// Bidirectional A* with average potentials.
///
/// With `h` the environment estimate, the forward side orders nodes by
/// `d(start, v) + pf(v)` and the backward side by `d(v, end) + pb(v)` where
///
/// `pf(v) = (h(v, end) - h(start, v)) / 2 + h(start, end) / 2`
/// `pb(v) = h(start, end) - pf(v)`
///
/// Both sides then see the same reduced edge costs, which stay non-negative
/// for a consistent `h`, so no closed node is ever reopened. The search stops
/// when `top_forward + top_backward >= best + h(start, end)` or a node is
/// closed by both sides.
pub struct BiAStar<'a, E: Environment> {
    env: &'a E,
    start_node: NodeId,
    end_node: NodeId,
    nodes: [NodeArena; 2],
    best: f64,
    meeting: Option<NodeId>,
    met: bool,
    stats: Stats,
}

impl<'a, E: Environment> BiAStar<'a, E> {
    pub fn new(env: &'a E) -> Self {
        BiAStar {
            env,
            start_node: 0,
            end_node: 0,
            nodes: [NodeArena::new(env.size()), NodeArena::new(env.size())],
            best: f64::INFINITY,
            meeting: None,
            met: false,
            stats: Stats::default(),
        }
    }

    fn clear(&mut self) {
        self.nodes[FORWARD].clear();
        self.nodes[BACKWARD].clear();
        self.best = f64::INFINITY;
        self.meeting = None;
        self.met = false;
        self.stats = Stats::default();
    }

    fn potential(&self, node: NodeId, side: usize) -> f64 {
        let to_end = self.env.estimate_distance(node, self.end_node);
        let from_start = self.env.estimate_distance(self.start_node, node);
        let half_total = self.env.estimate_distance(self.start_node, self.end_node) / 2.0;
        let forward = (to_end - from_start) / 2.0 + half_total;
        if side == FORWARD {
            forward
        } else {
            2.0 * half_total - forward
        }
    }

    // Expands one node of `side`. Returns true once the side has nothing left to expand.
    fn step(&mut self, side: usize, queue: &mut Queue) -> bool {
        let Some(QueueItem { key, node }) = queue.pop() else {
            return true;
        };
        // Stale entry, the node was closed or re-queued with a smaller score.
        let record = self.nodes[side].get(node);
        if record.visited || key > record.score {
            return queue.is_empty();
        }

        trace!("side {side} expands {node} at {key}");
        self.nodes[side].mark_visited(node);
        self.stats.expanded_nodes += 1;

        let other = 1 - side;
        if self.nodes[other].get(node).visited {
            self.met = true;
            return queue.is_empty();
        }

        let env = self.env;
        let node_distance = self.nodes[side].get(node).distance_or_inf();
        let edges = if side == FORWARD {
            env.neighbors(node)
        } else {
            env.predecessors(node)
        };

        for &(next, cost) in edges {
            if self.nodes[side].get(next).visited {
                continue;
            }

            let distance = node_distance + cost;
            if distance < self.nodes[side].get(next).distance_or_inf() {
                let score = distance + self.potential(next, side);
                self.nodes[side].update(next, Some(node), distance, score);
                queue.push(QueueItem::new(score, next));
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

impl<E: Environment> PathFinder for BiAStar<'_, E> {
    #[instrument(skip(self), name = "bi_a_star", level = "debug")]
    fn find_path(&mut self, start: NodeId, end: NodeId) -> Path {
        self.clear();
        if start == end {
            return vec![start];
        }
        self.start_node = start;
        self.end_node = end;

        let mut queues: [Queue; 2] = [BinaryHeap::new(), BinaryHeap::new()];
        for (side, origin) in [(FORWARD, start), (BACKWARD, end)] {
            let score = self.potential(origin, side);
            self.nodes[side].update(origin, None, 0.0, score);
            queues[side].push(QueueItem::new(score, origin));
        }

        let bound = self.env.estimate_distance(start, end);
        while !self.met {
            let (Some(forward_top), Some(backward_top)) = (queues[FORWARD].peek(), queues[BACKWARD].peek()) else {
                break;
            };
            if forward_top.key + backward_top.key >= self.best + bound {
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
