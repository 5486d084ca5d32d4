mod collision;
mod node;
mod reservation;

pub use collision::has_collision;
pub(crate) use node::{NodeArena, QueueItem};
pub use reservation::{ReservationTable, RESERVED_FOREVER};

use serde::{Deserialize, Serialize};

use crate::env::Environment;

pub type NodeId = usize;

/// Sequence of nodes, index is the time offset from the start of the path.
pub type Path = Vec<NodeId>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: usize,
    pub start: NodeId,
    pub goal: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub paths: Vec<Path>,
}

impl Solution {
    pub fn makespan(&self) -> usize {
        self.paths
            .iter()
            .map(|path| path.len().saturating_sub(1))
            .max()
            .unwrap_or(0)
    }

    /// Sum of path costs, `None` if any path contains an illegal step.
    pub fn cost<E: Environment>(&self, env: &E) -> Option<f64> {
        self.paths
            .iter()
            .map(|path| env.calculate_cost(path))
            .sum()
    }

    /// Agents that finished early are assumed to rest at their last node.
    /// `None` for an unknown agent or an empty path.
    pub fn position_at(&self, agent: usize, time: usize) -> Option<NodeId> {
        let path = self.paths.get(agent)?;
        path.get(time).or_else(|| path.last()).copied()
    }

    fn positions_at(&self, time: usize) -> Option<Vec<NodeId>> {
        (0..self.paths.len()).map(|agent| self.position_at(agent, time)).collect()
    }

    pub fn verify<E: Environment>(&self, env: &E, agents: &[Agent]) -> bool {
        if self.paths.len() != agents.len() {
            return false;
        }

        for (agent, path) in agents.iter().zip(&self.paths) {
            if path.first() != Some(&agent.start) || path.last() != Some(&agent.goal) {
                return false;
            }
            if path.windows(2).any(|step| !env.adjacent(step[0], step[1])) {
                return false;
            }
        }

        let edge_collision = env.edge_collision();
        let Some(mut positions) = self.positions_at(0) else {
            return false;
        };
        if has_collision(&positions, &positions, false) {
            return false;
        }

        for time in 1..=self.makespan() {
            let Some(next_positions) = self.positions_at(time) else {
                return false;
            };
            if has_collision(&positions, &next_positions, edge_collision) {
                return false;
            }
            positions = next_positions;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    #[test]
    fn test_position_at_rests_on_last_node() {
        let solution = Solution {
            paths: vec![vec![0, 1, 2], vec![3], vec![]],
        };
        assert_eq!(solution.makespan(), 2);
        assert_eq!(solution.position_at(0, 1), Some(1));
        assert_eq!(solution.position_at(0, 9), Some(2));
        assert_eq!(solution.position_at(1, 2), Some(3));
        assert_eq!(solution.position_at(2, 0), None);
        assert_eq!(solution.position_at(3, 0), None);
    }

    #[test]
    fn test_verify_rejects_empty_path() {
        let mut graph = Graph::new(2, false);
        graph.add_edge(0, 1, 1.0).unwrap();
        let agents = vec![Agent { id: 0, start: 0, goal: 1 }];

        assert!(Solution { paths: vec![vec![0, 1]] }.verify(&graph, &agents));
        assert!(!Solution { paths: vec![vec![]] }.verify(&graph, &agents));
        assert!(!Solution { paths: vec![vec![1, 0]] }.verify(&graph, &agents));
    }
}
