use super::{construct_path, ReverseResumableSearch, Trace};
use crate::common::{NodeId, Path, ReservationTable, RESERVED_FOREVER};
use crate::env::Environment;
use crate::stat::Stats;

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, instrument, trace};

#[derive(Clone, Copy, Debug)]
struct OpenNode {
    node: NodeId,
    f_cost: f64,
    g_cost: f64,
    time_step: usize, // relative to the start time of the search
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_cost
            .total_cmp(&other.f_cost)
            // Later time step has higher priority
            .then_with(|| other.time_step.cmp(&self.time_step))
            .then_with(|| self.node.cmp(&other.node))
            .then_with(|| self.g_cost.total_cmp(&other.g_cost))
    }
}

/// A* over `(node, time)` states that respects a reservation table.
pub struct SpaceTimeAStar<'a, E: Environment> {
    env: &'a E,
    stats: Stats,
}

impl<'a, E: Environment> SpaceTimeAStar<'a, E> {
    pub fn new(env: &'a E) -> Self {
        SpaceTimeAStar {
            env,
            stats: Stats::default(),
        }
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Cheapest path from `start` to `goal` that avoids `reservation_table`,
    /// starting at time 0. The agent may pass the goal early but only stops
    /// there after the last reservation of the goal. Empty if the goal is held
    /// permanently or cannot be reached.
    #[instrument(skip(self, reservation_table), name = "space_time_a_star", level = "debug")]
    pub fn find_path(
        &mut self,
        start: NodeId,
        goal: NodeId,
        reservation_table: Option<&ReservationTable>,
    ) -> Path {
        let min_terminal_time = reservation_table.and_then(|rt| rt.last_time_reserved(goal));
        if min_terminal_time == Some(RESERVED_FOREVER) {
            debug!("goal {goal} is reserved forever");
            return Vec::new();
        }

        // Past the last reservation a simple path is always cheapest.
        let horizon = reservation_table
            .and_then(ReservationTable::max_time)
            .unwrap_or(0)
            + self.env.size();
        let mut rrs = ReverseResumableSearch::new(self.env, goal);
        self.search(start, horizon, reservation_table, &mut rrs, 0, |node, time_step| {
            node == goal && min_terminal_time.map_or(true, |t| time_step > t)
        })
    }

    /// Cheapest path that reaches `goal` after exactly `length` steps. The
    /// goal may be visited before that; reservations of the goal after
    /// `length` are not checked.
    #[instrument(skip(self, reservation_table), name = "space_time_a_star", level = "debug")]
    pub fn find_path_with_exact_length(
        &mut self,
        start: NodeId,
        goal: NodeId,
        length: usize,
        reservation_table: Option<&ReservationTable>,
    ) -> Path {
        let mut rrs = ReverseResumableSearch::new(self.env, goal);
        self.search(start, length, reservation_table, &mut rrs, 0, |node, time_step| {
            node == goal && time_step == length
        })
    }

    /// Plans at most `search_depth` steps from `start`, which is occupied at
    /// `start_time`. The search ends at the first state that is either
    /// `search_depth` steps deep or sits on `goal` later than
    /// `min_terminal_time`; the state with the lowest `g + rrs.distance`
    /// wins. A move `u -> v` leaving at time `t` is legal if `v` is free at
    /// `t + 1` and, with edge collision, nobody moves `v -> u` at `t`.
    ///
    /// The returned path starts with `start`; it is empty if no terminal state
    /// can be reached.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip(self, reservation_table, rrs), name = "space_time_a_star", level = "debug")]
    pub fn find_path_with_depth_limit(
        &mut self,
        start: NodeId,
        goal: NodeId,
        search_depth: usize,
        reservation_table: Option<&ReservationTable>,
        rrs: &mut ReverseResumableSearch<'_, E>,
        min_terminal_time: Option<usize>,
        start_time: usize,
    ) -> Path {
        self.search(start, search_depth, reservation_table, rrs, start_time, |node, time_step| {
            let settled = node == goal && min_terminal_time.map_or(true, |t| start_time + time_step > t);
            time_step == search_depth || settled
        })
    }

    // States deeper than `max_depth` are never generated.
    fn search(
        &mut self,
        start: NodeId,
        max_depth: usize,
        reservation_table: Option<&ReservationTable>,
        rrs: &mut ReverseResumableSearch<'_, E>,
        start_time: usize,
        is_terminal: impl Fn(NodeId, usize) -> bool,
    ) -> Path {
        let env = self.env;
        let edge_collision = env.edge_collision();

        let mut open_list = BTreeSet::new();
        let mut closed_list: HashSet<(NodeId, usize)> = HashSet::new();
        let mut g_costs: HashMap<(NodeId, usize), f64> = HashMap::new();
        let mut trace: Trace = HashMap::new();

        let start_h_cost = rrs.distance(start);
        if !start_h_cost.is_finite() {
            debug!("goal is unreachable from start");
            return Vec::new();
        }
        open_list.insert(OpenNode {
            node: start,
            f_cost: start_h_cost,
            g_cost: 0.0,
            time_step: 0,
        });
        g_costs.insert((start, 0), 0.0);

        while let Some(current) = open_list.pop_first() {
            if !closed_list.insert((current.node, current.time_step)) {
                continue;
            }
            trace!("expand node: {current:?}");
            self.stats.expanded_nodes += 1;

            if is_terminal(current.node, current.time_step) {
                return construct_path(&trace, (current.node, current.time_step));
            }
            if current.time_step >= max_depth {
                continue;
            }

            let time = start_time + current.time_step;
            let next_time_step = current.time_step + 1;
            for &(neighbor, cost) in env.neighbors(current.node) {
                if closed_list.contains(&(neighbor, next_time_step)) {
                    continue;
                }

                // Check reservations before exploring the neighbor.
                if let Some(rt) = reservation_table {
                    if rt.is_reserved(time + 1, neighbor) {
                        continue;
                    }
                    if edge_collision && neighbor != current.node && rt.is_edge_reserved(time, neighbor, current.node) {
                        continue;
                    }
                }

                let h_cost = rrs.distance(neighbor);
                if !h_cost.is_finite() {
                    continue;
                }

                let tentative_g_cost = current.g_cost + cost;
                let key = (neighbor, next_time_step);
                if tentative_g_cost < *g_costs.get(&key).unwrap_or(&f64::INFINITY) {
                    g_costs.insert(key, tentative_g_cost);
                    trace.insert(key, (current.node, current.time_step));
                    open_list.insert(OpenNode {
                        node: neighbor,
                        f_cost: tentative_g_cost + h_cost,
                        g_cost: tentative_g_cost,
                        time_step: next_time_step,
                    });
                }
            }
        }

        debug!("cannot find solution");
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::map::Map;

    // Helper function to setup tracing
    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_env_filter("trace").try_init();
    }

    fn line_with_waits(size: usize) -> Graph {
        let mut graph = Graph::new(size, false);
        for node in 0..size {
            graph.add_edge(node, node, 1.0).unwrap();
            if node + 1 < size {
                graph.add_edge(node, node + 1, 1.0).unwrap();
            }
        }
        graph
    }

    #[test]
    fn test_depth_limit_truncates_path() {
        init_tracing();
        let graph = line_with_waits(5);
        let mut search = SpaceTimeAStar::new(&graph);

        for depth in 0..7 {
            let mut rrs = ReverseResumableSearch::new(&graph, 4);
            let path = search.find_path_with_depth_limit(0, 4, depth, None, &mut rrs, None, 0);
            assert_eq!(path.len() - 1, depth.min(4));
            assert_eq!(path[0], 0);
        }
    }

    #[test]
    fn test_waits_for_reserved_node() {
        init_tracing();
        // 0 - 1 - 2 with waits everywhere, node 1 taken at times 1 and 2.
        let graph = line_with_waits(3);
        let mut rt = ReservationTable::new(3);
        rt.add_vertex_constraint(1, 1);
        rt.add_vertex_constraint(2, 1);

        let mut search = SpaceTimeAStar::new(&graph);
        let mut rrs = ReverseResumableSearch::new(&graph, 2);
        let path = search.find_path_with_depth_limit(0, 2, 10, Some(&rt), &mut rrs, None, 0);
        assert_eq!(path, vec![0, 0, 0, 1, 2]);
    }

    #[test]
    fn test_directed_graph_with_reservation() {
        let mut graph = Graph::new(3, true);
        graph.add_edges(&[(0, 0, 1.0), (0, 1, 1.0), (1, 2, 1.0)]).unwrap();
        let mut rt = ReservationTable::new(3);
        rt.add_path(0, &[1, 1, 1], false, false);

        let mut search = SpaceTimeAStar::new(&graph);
        let mut rrs = ReverseResumableSearch::new(&graph, 2);
        let path = search.find_path_with_depth_limit(0, 2, 10, Some(&rt), &mut rrs, None, 0);
        assert_eq!(path, vec![0, 0, 0, 1, 2]);
    }

    #[test]
    fn test_min_terminal_time_keeps_agent_off_goal() {
        let graph = line_with_waits(3);
        let mut search = SpaceTimeAStar::new(&graph);
        let mut rrs = ReverseResumableSearch::new(&graph, 1);

        // Goal is taken until time 3, arriving earlier is allowed but not settling.
        let mut rt = ReservationTable::new(3);
        rt.add_vertex_constraint(3, 1);
        let path = search.find_path_with_depth_limit(0, 1, 10, Some(&rt), &mut rrs, Some(3), 0);
        assert_eq!(path.len(), 5);
        assert_eq!(path.last(), Some(&1));
        assert_ne!(path[3], 1);
    }

    #[test]
    fn test_start_time_offsets_reservations() {
        let graph = line_with_waits(3);
        let mut rt = ReservationTable::new(3);
        rt.add_vertex_constraint(6, 1);

        let mut search = SpaceTimeAStar::new(&graph);
        let mut rrs = ReverseResumableSearch::new(&graph, 2);
        let path = search.find_path_with_depth_limit(0, 2, 10, Some(&rt), &mut rrs, None, 5);
        assert_eq!(path, vec![0, 0, 1, 2]);
    }

    #[test]
    fn test_edge_collision_blocks_swap() {
        // 0 - 1 without waits, someone moves 1 -> 0 at time 0.
        let mut graph = Graph::new(2, false);
        graph.add_edge(0, 1, 1.0).unwrap();
        let mut rt = ReservationTable::new(2);
        rt.add_edge_constraint(0, 1, 0);

        {
            let mut rrs = ReverseResumableSearch::new(&graph, 1);
            let mut search = SpaceTimeAStar::new(&graph);
            let path = search.find_path_with_depth_limit(0, 1, 3, Some(&rt), &mut rrs, None, 0);
            assert_eq!(path, vec![0, 1]);
        }

        let graph = graph.with_edge_collision(true);
        let mut rrs = ReverseResumableSearch::new(&graph, 1);
        let mut search = SpaceTimeAStar::new(&graph);
        let path = search.find_path_with_depth_limit(0, 1, 3, Some(&rt), &mut rrs, None, 0);
        assert!(path.is_empty());
    }

    #[test]
    fn test_grid_detour_within_window() {
        let map = Map::from_file("map_file/test/test.map").unwrap();
        let start = map.node_id(2, 2);
        let goal = map.node_id(0, 0);
        let mut rrs = ReverseResumableSearch::new(&map, goal);
        let mut search = SpaceTimeAStar::new(&map);

        let path = search.find_path_with_depth_limit(start, goal, 2, None, &mut rrs, None, 0);
        assert_eq!(path.len(), 3);
        assert_eq!(rrs.distance(path[2]), 2.0);
        assert!(search.stats().expanded_nodes > 0);
    }

    #[test]
    fn test_find_path_directed_graph() {
        let mut graph = Graph::new(3, true);
        graph.add_edges(&[(0, 0, 1.0), (0, 1, 1.0), (1, 2, 1.0)]).unwrap();
        let mut rt = ReservationTable::new(3);
        rt.add_path(0, &[1, 1, 1], false, false);

        let mut search = SpaceTimeAStar::new(&graph);
        assert_eq!(search.find_path(0, 2, Some(&rt)), vec![0, 0, 0, 1, 2]);
        assert_eq!(search.find_path(0, 2, None), vec![0, 1, 2]);
        assert!(search.find_path(2, 0, None).is_empty());
    }

    #[test]
    fn test_find_path_directed_weighted_graph() {
        let mut graph = Graph::new(5, true);
        graph
            .add_edges(&[(0, 1, 100.0), (0, 4, 1.0), (1, 2, 100.0), (2, 3, 100.0)])
            .unwrap();

        let mut search = SpaceTimeAStar::new(&graph);
        assert_eq!(search.find_path(0, 3, None), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_find_path_detours_around_reserved_cell() {
        let map = Map::from_weights(&[vec![1.0; 3], vec![1.0; 3]]).unwrap();
        let blocked = map.node_id(0, 1);
        let mut rt = ReservationTable::new(map.size());
        rt.add_path(0, &[blocked; 4], false, false);

        let mut search = SpaceTimeAStar::new(&map);
        let path = search.find_path(map.node_id(0, 0), map.node_id(0, 2), Some(&rt));
        let expected: Vec<NodeId> = [(0, 0), (1, 0), (1, 1), (1, 2), (0, 2)]
            .iter()
            .map(|&(x, y)| map.node_id(x, y))
            .collect();
        assert_eq!(path, expected);
    }

    #[test]
    fn test_second_agent_depends_on_pause_weight() {
        init_tracing();
        let weights = vec![
            vec![1.0, 2.0, 0.9, -1.0],
            vec![1.0, -1.0, 0.9, -1.0],
            vec![1.0, 1.0, 1.0, 1.0],
        ];
        let cells = |map: &Map, cells: &[(usize, usize)]| -> Path {
            cells.iter().map(|&(x, y)| map.node_id(x, y)).collect()
        };

        let map = Map::from_weights(&weights).unwrap();
        let first = SpaceTimeAStar::new(&map).find_path(map.node_id(0, 0), map.node_id(2, 3), None);
        assert_eq!(first, cells(&map, &[(0, 0), (1, 0), (2, 0), (2, 1), (2, 2), (2, 3)]));
        let mut rt = ReservationTable::new(map.size());
        rt.add_path(0, &first, false, false);

        // Waiting is expensive, so the second agent bounces next to its goal.
        let mut map = Map::from_weights(&weights).unwrap();
        map.set_pause_cost(5.0).unwrap();
        let second = SpaceTimeAStar::new(&map).find_path(map.node_id(0, 0), map.node_id(2, 2), Some(&rt));
        assert_eq!(
            second,
            cells(&map, &[(0, 0), (0, 1), (0, 2), (1, 2), (0, 2), (1, 2), (2, 2)])
        );

        // Waiting is cheap, so it follows one step behind.
        map.set_pause_cost(0.1).unwrap();
        let second = SpaceTimeAStar::new(&map).find_path(map.node_id(0, 0), map.node_id(2, 2), Some(&rt));
        assert_eq!(second, cells(&map, &[(0, 0), (0, 0), (1, 0), (2, 0), (2, 1), (2, 2)]));
    }

    #[test]
    fn test_path_with_exact_length() {
        let mut map = Map::from_weights(&[
            vec![-1.0, 1.0, -1.0],
            vec![1.0, 1.0, 1.0],
            vec![1.0, 1.0, 1.0],
        ])
        .unwrap();
        map.set_pause_weights(&[vec![1.0, 0.1, 1.0], vec![1.0; 3], vec![1.0; 3]])
            .unwrap();

        let mut search = SpaceTimeAStar::new(&map);
        let path = search.find_path_with_exact_length(map.node_id(1, 0), map.node_id(1, 2), 5, None);
        let expected: Vec<NodeId> = [(1, 0), (1, 1), (0, 1), (0, 1), (1, 1), (1, 2)]
            .iter()
            .map(|&(x, y)| map.node_id(x, y))
            .collect();
        assert_eq!(path, expected);
        let cost = map.calculate_cost(&path).unwrap();
        assert!((cost - 4.1).abs() < 1e-9);

        assert!(search
            .find_path_with_exact_length(map.node_id(1, 0), map.node_id(1, 2), 1, None)
            .is_empty());
    }

    #[test]
    fn test_goal_reserved_forever() {
        let graph = line_with_waits(3);
        let mut rt = ReservationTable::new(3);
        rt.add_permanent_constraint(4, 2);

        let mut search = SpaceTimeAStar::new(&graph);
        assert!(search.find_path(0, 2, Some(&rt)).is_empty());
        assert_eq!(search.find_path(0, 1, Some(&rt)), vec![0, 1]);
    }
}
