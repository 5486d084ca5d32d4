use super::NodeId;

use std::collections::HashMap;

/// Checks one synchronous step of all agents for a vertex conflict, and for a
/// swap conflict when `edge_collision` is set.
///
/// Both slices are indexed by agent and should have the same length. Agents
/// missing from `positions` are never part of a swap.
pub fn has_collision(positions: &[NodeId], next_positions: &[NodeId], edge_collision: bool) -> bool {
    let mut node_to_agent: HashMap<NodeId, usize> = HashMap::with_capacity(next_positions.len());
    for (agent, &node) in next_positions.iter().enumerate() {
        if node_to_agent.insert(node, agent).is_some() {
            return true;
        }
    }

    if edge_collision {
        for (&position, &next_position) in positions.iter().zip(next_positions) {
            if position == next_position {
                continue;
            }
            // Someone moves into our old node, check if it came from where we go.
            if let Some(&other) = node_to_agent.get(&position) {
                if positions.get(other) == Some(&next_position) {
                    return true;
                }
            }
        }
    }

    false
}
