use crate::common::NodeId;
use crate::env::Environment;
use crate::error::{MapfError, Result};

/// Adjacency-list graph with optional node coordinates.
///
/// Without coordinates the heuristic is zero, which turns every A* variant
/// into its Dijkstra counterpart.
#[derive(Debug, Clone)]
pub struct Graph {
    directed: bool,
    edge_collision: bool,
    successors: Vec<Vec<(NodeId, f64)>>,
    predecessors: Vec<Vec<(NodeId, f64)>>,
    coordinates: Option<Vec<Vec<f64>>>,
}

impl Graph {
    pub fn new(size: usize, directed: bool) -> Self {
        Graph {
            directed,
            edge_collision: false,
            successors: vec![Vec::new(); size],
            predecessors: vec![Vec::new(); size],
            coordinates: None,
        }
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn set_edge_collision(&mut self, edge_collision: bool) {
        self.edge_collision = edge_collision;
    }

    pub fn with_edge_collision(mut self, edge_collision: bool) -> Self {
        self.set_edge_collision(edge_collision);
        self
    }

    /// Coordinates must make the Euclidean distance a lower bound on edge costs.
    pub fn set_coordinates(&mut self, coordinates: Vec<Vec<f64>>) -> Result<()> {
        if coordinates.len() != self.size() {
            return Err(MapfError::InvalidInput(format!(
                "expected {} coordinates, got {}",
                self.size(),
                coordinates.len()
            )));
        }
        self.coordinates = Some(coordinates);
        Ok(())
    }

    /// Adds `from -> to`, and `to -> from` for undirected graphs. Adding an
    /// existing edge again overwrites its cost.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, cost: f64) -> Result<()> {
        if from >= self.size() || to >= self.size() {
            return Err(MapfError::InvalidInput(format!(
                "edge ({from}, {to}) out of range for graph of size {}",
                self.size()
            )));
        }
        if !cost.is_finite() || cost < 0.0 {
            return Err(MapfError::InvalidInput(format!(
                "edge ({from}, {to}) has invalid cost {cost}"
            )));
        }

        self.insert_arc(from, to, cost);
        if !self.directed && from != to {
            self.insert_arc(to, from, cost);
        }
        Ok(())
    }

    pub fn add_edges(&mut self, edges: &[(NodeId, NodeId, f64)]) -> Result<()> {
        for &(from, to, cost) in edges {
            self.add_edge(from, to, cost)?;
        }
        Ok(())
    }

    pub fn num_edges(&self) -> usize {
        self.successors.iter().map(Vec::len).sum()
    }

    fn insert_arc(&mut self, from: NodeId, to: NodeId, cost: f64) {
        match self.successors[from].iter_mut().find(|(node, _)| *node == to) {
            Some(arc) => arc.1 = cost,
            None => self.successors[from].push((to, cost)),
        }
        match self.predecessors[to].iter_mut().find(|(node, _)| *node == from) {
            Some(arc) => arc.1 = cost,
            None => self.predecessors[to].push((from, cost)),
        }
    }
}

impl Environment for Graph {
    fn size(&self) -> usize {
        self.successors.len()
    }

    fn edge_collision(&self) -> bool {
        self.edge_collision
    }

    fn neighbors(&self, node: NodeId) -> &[(NodeId, f64)] {
        &self.successors[node]
    }

    fn predecessors(&self, node: NodeId) -> &[(NodeId, f64)] {
        &self.predecessors[node]
    }

    fn estimate_distance(&self, from: NodeId, to: NodeId) -> f64 {
        match &self.coordinates {
            Some(coordinates) => coordinates[from]
                .iter()
                .zip(&coordinates[to])
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt(),
            None => 0.0,
        }
    }
}
