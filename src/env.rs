use crate::common::NodeId;

/// Weighted graph the searches run on.
///
/// A self loop `(node, cost)` in `neighbors(node)` is a wait action; an
/// environment without it does not let agents stand still on `node`.
pub trait Environment {
    fn size(&self) -> usize;

    /// Whether two agents may not swap positions in one step.
    fn edge_collision(&self) -> bool;

    /// Outgoing moves with their cost.
    fn neighbors(&self, node: NodeId) -> &[(NodeId, f64)];

    /// Incoming moves with their cost, used by backward searches.
    fn predecessors(&self, node: NodeId) -> &[(NodeId, f64)];

    /// Admissible and consistent lower bound on the distance `from -> to`.
    fn estimate_distance(&self, from: NodeId, to: NodeId) -> f64;

    fn edge_cost(&self, from: NodeId, to: NodeId) -> Option<f64> {
        self.neighbors(from)
            .iter()
            .find(|&&(node, _)| node == to)
            .map(|&(_, cost)| cost)
    }

    fn adjacent(&self, from: NodeId, to: NodeId) -> bool {
        from == to || self.edge_cost(from, to).is_some()
    }

    /// `None` if the path contains a step that is not a move of this environment.
    fn calculate_cost(&self, path: &[NodeId]) -> Option<f64> {
        path.windows(2)
            .map(|step| self.edge_cost(step[0], step[1]))
            .sum()
    }
}
