use super::NodeId;

use std::collections::{HashMap, HashSet};

/// Returned by `last_time_reserved` for nodes held by a permanent reservation.
pub const RESERVED_FOREVER: usize = usize::MAX;

/// Spacetime ledger of occupied nodes and in-flight moves.
///
/// A vertex reservation `(time, node)` blocks `node` at `time`. An edge
/// reservation `(time, from, to)` means some agent traverses `from -> to`
/// between `time` and `time + 1`. A permanent reservation blocks its node from
/// the given time onwards.
#[derive(Debug, Clone, Default)]
pub struct ReservationTable {
    size: usize,
    vertices: HashSet<(usize, NodeId)>,
    edges: HashSet<(usize, NodeId, NodeId)>,
    last_time: HashMap<NodeId, usize>,
    permanent: HashMap<NodeId, usize>,
}

impl ReservationTable {
    pub fn new(size: usize) -> Self {
        ReservationTable {
            size,
            ..Default::default()
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_reserved(&self, time: usize, node: NodeId) -> bool {
        if let Some(&from_time) = self.permanent.get(&node) {
            if time >= from_time {
                return true;
            }
        }
        self.vertices.contains(&(time, node))
    }

    pub fn is_edge_reserved(&self, time: usize, from: NodeId, to: NodeId) -> bool {
        self.edges.contains(&(time, from, to))
    }

    /// `None` if `node` has never been reserved.
    pub fn last_time_reserved(&self, node: NodeId) -> Option<usize> {
        if self.permanent.contains_key(&node) {
            return Some(RESERVED_FOREVER);
        }
        self.last_time.get(&node).copied()
    }

    /// Latest time step any reservation refers to, `None` for an empty table.
    /// Permanent reservations count with the time they start.
    pub fn max_time(&self) -> Option<usize> {
        let vertices = self.last_time.values().copied();
        let edges = self.edges.iter().map(|&(time, _, _)| time + 1);
        let permanent = self.permanent.values().copied();
        vertices.chain(edges).chain(permanent).max()
    }

    pub fn add_vertex_constraint(&mut self, time: usize, node: NodeId) {
        self.vertices.insert((time, node));
        let last = self.last_time.entry(node).or_insert(time);
        *last = (*last).max(time);
    }

    pub fn add_edge_constraint(&mut self, time: usize, from: NodeId, to: NodeId) {
        self.edges.insert((time, from, to));
    }

    pub fn add_permanent_constraint(&mut self, time: usize, node: NodeId) {
        let from_time = self.permanent.entry(node).or_insert(time);
        *from_time = (*from_time).min(time);
    }

    /// Reserves `path[i]` at `start_time + i`. With `edge_collision` every
    /// non-wait move is reserved too, with `permanent` the last node stays
    /// reserved after the path ends.
    pub fn add_path(&mut self, start_time: usize, path: &[NodeId], permanent: bool, edge_collision: bool) {
        for (offset, &node) in path.iter().enumerate() {
            self.add_vertex_constraint(start_time + offset, node);
        }

        if edge_collision {
            for (offset, step) in path.windows(2).enumerate() {
                if step[0] != step[1] {
                    self.add_edge_constraint(start_time + offset, step[0], step[1]);
                }
            }
        }

        if permanent {
            if let Some(&last) = path.last() {
                self.add_permanent_constraint(start_time + path.len() - 1, last);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table() {
        let rt = ReservationTable::new(4);
        assert_eq!(rt.size(), 4);
        assert_eq!(rt.last_time_reserved(2), None);
        assert!(!rt.is_reserved(0, 2));
        assert_eq!(rt.max_time(), None);
    }

    #[test]
    fn test_add_path_reserves_vertices_with_offset() {
        let mut rt = ReservationTable::new(5);
        rt.add_path(3, &[0, 1, 1, 2], false, false);

        assert!(rt.is_reserved(3, 0));
        assert!(rt.is_reserved(4, 1));
        assert!(rt.is_reserved(5, 1));
        assert!(rt.is_reserved(6, 2));
        assert!(!rt.is_reserved(7, 2));
        assert_eq!(rt.last_time_reserved(1), Some(5));
        assert_eq!(rt.last_time_reserved(2), Some(6));
        assert!(!rt.is_edge_reserved(3, 0, 1));
        assert_eq!(rt.max_time(), Some(6));
    }

    #[test]
    fn test_add_path_reserves_moves_but_not_waits() {
        let mut rt = ReservationTable::new(5);
        rt.add_path(0, &[0, 1, 1, 2], false, true);

        assert!(rt.is_edge_reserved(0, 0, 1));
        assert!(!rt.is_edge_reserved(0, 1, 0));
        assert!(!rt.is_edge_reserved(1, 1, 1));
        assert!(rt.is_edge_reserved(2, 1, 2));
    }

    #[test]
    fn test_permanent_reservation() {
        let mut rt = ReservationTable::new(5);
        rt.add_path(0, &[0, 1, 2], true, false);

        assert!(!rt.is_reserved(1, 2));
        assert!(rt.is_reserved(2, 2));
        assert!(rt.is_reserved(1000, 2));
        assert_eq!(rt.last_time_reserved(2), Some(RESERVED_FOREVER));
        assert_eq!(rt.last_time_reserved(1), Some(1));
    }

    #[test]
    fn test_last_time_keeps_maximum() {
        let mut rt = ReservationTable::new(3);
        rt.add_vertex_constraint(7, 1);
        rt.add_vertex_constraint(2, 1);
        assert_eq!(rt.last_time_reserved(1), Some(7));
    }
}
