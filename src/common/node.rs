use super::NodeId;

use std::cmp::Ordering;

#[derive(Clone, Debug)]
pub(crate) struct SearchNode {
    pub(crate) parent: Option<NodeId>,
    pub(crate) distance: Option<f64>, // from the origin of this search side
    pub(crate) score: f64,            // distance + potential, unused by Dijkstra
    pub(crate) visited: bool,
}

impl Default for SearchNode {
    fn default() -> Self {
        SearchNode {
            parent: None,
            distance: None,
            score: 0.0,
            visited: false,
        }
    }
}

impl SearchNode {
    pub(crate) fn clear(&mut self) {
        *self = SearchNode::default();
    }

    pub(crate) fn distance_or_inf(&self) -> f64 {
        self.distance.unwrap_or(f64::INFINITY)
    }
}

/// Dense per-node records of one search side, indexed by node id.
///
/// Only touched records are reset by `clear`, so a long-lived engine pays for
/// what the previous query explored rather than for the whole graph.
#[derive(Clone, Debug)]
pub(crate) struct NodeArena {
    nodes: Vec<SearchNode>,
    workset: Vec<NodeId>,
}

impl NodeArena {
    pub(crate) fn new(size: usize) -> Self {
        NodeArena {
            nodes: vec![SearchNode::default(); size],
            workset: Vec::new(),
        }
    }

    pub(crate) fn clear(&mut self) {
        for node in self.workset.drain(..) {
            self.nodes[node].clear();
        }
    }

    pub(crate) fn touched(&self) -> &[NodeId] {
        &self.workset
    }

    pub(crate) fn get(&self, node: NodeId) -> &SearchNode {
        &self.nodes[node]
    }

    pub(crate) fn update(&mut self, node: NodeId, parent: Option<NodeId>, distance: f64, score: f64) {
        let record = &mut self.nodes[node];
        if record.distance.is_none() {
            self.workset.push(node);
        }
        record.parent = parent;
        record.distance = Some(distance);
        record.score = score;
    }

    pub(crate) fn mark_visited(&mut self, node: NodeId) {
        self.nodes[node].visited = true;
    }

    /// Nodes from `node` back to the root of this side, `node` first.
    pub(crate) fn trace_back(&self, mut node: NodeId) -> Vec<NodeId> {
        let mut path = vec![node];
        while let Some(parent) = self.nodes[node].parent {
            path.push(parent);
            node = parent;
        }
        path
    }
}

// Open list entry, BinaryHeap pops the smallest (key, node) first.
#[derive(Clone, Copy, Debug)]
pub(crate) struct QueueItem {
    pub(crate) key: f64,
    pub(crate) node: NodeId,
}

impl QueueItem {
    pub(crate) fn new(key: f64, node: NodeId) -> Self {
        QueueItem { key, node }
    }
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Inverted for min-heap behavior, lower node id wins ties.
        other
            .key
            .total_cmp(&self.key)
            .then_with(|| other.node.cmp(&self.node))
    }
}
