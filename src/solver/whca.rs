use super::MapfSolver;
use crate::algorithm::{ReverseResumableSearch, SpaceTimeAStar};
use crate::common::{NodeId, Path, ReservationTable, Solution};
use crate::env::Environment;
use crate::error::{MapfError, Result};
use crate::stat::Stats;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Order in which agents claim the reservation table each round. Agents
/// planned earlier win conflicts, so this is their priority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityPolicy {
    /// Agents in the order they were given.
    #[default]
    InputOrder,
    /// Agents with the longest distance to their goal first.
    LongestFirst,
    /// Agents with the shortest distance to their goal first.
    ShortestFirst,
    /// Explicit permutation of agent indices.
    Fixed(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhcaOptions {
    /// Hard deadline, no agent path grows beyond this time step.
    pub max_length: usize,
    /// Steps committed per agent and round.
    pub window_size: usize,
    pub priority: PriorityPolicy,
}

impl Default for WhcaOptions {
    fn default() -> Self {
        WhcaOptions {
            max_length: 100,
            window_size: 16,
            priority: PriorityPolicy::InputOrder,
        }
    }
}

/// Why a plan was abandoned. The public result collapses all of these into
/// `None`; `WHCAStar::last_failure` keeps the detail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanFailure {
    #[error("goal of agent {agent} is reserved until {reserved_until}, beyond the deadline")]
    DeadlineExceeded { agent: usize, reserved_until: usize },

    #[error("agent {agent} has no planning window left at time {time}")]
    WindowCollapsed { agent: usize, time: usize },

    #[error("agent {agent} is blocked by reservations at time {time}")]
    Blocked { agent: usize, time: usize },
}

/// State of one agent during a planning call.
pub struct PlanningAgent<'a, E: Environment> {
    pub id: usize,
    pub start: NodeId,
    pub goal: NodeId,
    pub path: Path,
    pub rrs: ReverseResumableSearch<'a, E>,
}

impl<'a, E: Environment> PlanningAgent<'a, E> {
    pub fn new(env: &'a E, id: usize, start: NodeId, goal: NodeId) -> Self {
        PlanningAgent {
            id,
            start,
            goal,
            path: vec![start],
            rrs: ReverseResumableSearch::new(env, goal),
        }
    }

    pub fn position(&self) -> NodeId {
        self.path[self.path.len() - 1]
    }

    /// Appends a fragment that starts at the current position. An empty
    /// fragment leaves the path unchanged.
    pub fn add_path(&mut self, fragment: &[NodeId]) {
        if let Some((first, rest)) = fragment.split_first() {
            debug_assert_eq!(*first, self.position());
            self.path.extend_from_slice(rest);
        }
    }
}

/// Windowed Hierarchical Cooperative A*.
///
/// Agents are planned one after another, each for at most `window_size`
/// steps, against a shared reservation table holding every step committed
/// before. Rounds repeat until every agent rests on its goal with nobody
/// passing through it later. Any agent that cannot make progress fails the
/// whole plan.
///
/// Swap conflicts are only checked when the environment reports
/// `edge_collision`. Without it two agents may trade places in one step, and
/// such plans are valid.
pub struct WHCAStar<'a, E: Environment> {
    env: &'a E,
    options: WhcaOptions,
    st_a_star: SpaceTimeAStar<'a, E>,
    last_failure: Option<PlanFailure>,
    stats: Stats,
}

impl<'a, E: Environment> WHCAStar<'a, E> {
    pub fn new(env: &'a E) -> Self {
        Self::with_options(env, WhcaOptions::default())
    }

    pub fn with_options(env: &'a E, options: WhcaOptions) -> Self {
        WHCAStar {
            env,
            options,
            st_a_star: SpaceTimeAStar::new(env),
            last_failure: None,
            stats: Stats::default(),
        }
    }

    pub fn options(&self) -> &WhcaOptions {
        &self.options
    }

    pub fn last_failure(&self) -> Option<&PlanFailure> {
        self.last_failure.as_ref()
    }

    /// Plans with explicit options, optionally on top of a pre-populated
    /// reservation table. The table is copied, never modified.
    #[instrument(skip_all, name = "whca", fields(agents = starts.len()), level = "debug")]
    pub fn mapf_with(
        &mut self,
        starts: &[NodeId],
        goals: &[NodeId],
        options: &WhcaOptions,
        reservation_table: Option<&ReservationTable>,
    ) -> Result<Option<Solution>> {
        self.validate(starts, goals, options, reservation_table)?;
        self.last_failure = None;
        self.stats = Stats::default();

        if starts.is_empty() {
            return Ok(Some(Solution { paths: Vec::new() }));
        }

        let total_solve_start_time = Instant::now();
        let mut rt = reservation_table
            .cloned()
            .unwrap_or_else(|| ReservationTable::new(self.env.size()));

        let mut agents: Vec<PlanningAgent<'a, E>> = starts
            .iter()
            .zip(goals)
            .enumerate()
            .map(|(id, (&start, &goal))| PlanningAgent::new(self.env, id, start, goal))
            .collect();
        let order = priority_order(&options.priority, &mut agents)?;
        debug!("planning order: {order:?}");

        let expanded_before = self.st_a_star.stats().expanded_nodes;
        let outcome = self.plan(&mut agents, &order, options, &mut rt);
        self.stats.expanded_nodes = self.st_a_star.stats().expanded_nodes - expanded_before;
        self.stats.time_ms = total_solve_start_time.elapsed().as_micros() as usize;
        self.stats.heuristic_expanded_nodes = agents.iter().map(|agent| agent.rrs.expanded()).sum();

        match outcome {
            Ok(()) => {
                let solution = Solution {
                    paths: agents.into_iter().map(|agent| agent.path).collect(),
                };
                self.stats.costs = solution.cost(self.env).unwrap_or(f64::INFINITY);
                Ok(Some(solution))
            }
            Err(failure) => {
                info!("whca failed: {failure}");
                self.last_failure = Some(failure);
                Ok(None)
            }
        }
    }

    fn validate(
        &self,
        starts: &[NodeId],
        goals: &[NodeId],
        options: &WhcaOptions,
        reservation_table: Option<&ReservationTable>,
    ) -> Result<()> {
        if starts.len() != goals.len() {
            return Err(MapfError::InvalidInput(format!(
                "got {} starts but {} goals",
                starts.len(),
                goals.len()
            )));
        }
        if let Some(&node) = starts.iter().chain(goals).find(|&&node| node >= self.env.size()) {
            return Err(MapfError::InvalidInput(format!(
                "node {node} out of range for environment of size {}",
                self.env.size()
            )));
        }
        let mut occupied = HashSet::with_capacity(starts.len());
        if let Some(&node) = starts.iter().find(|&&node| !occupied.insert(node)) {
            return Err(MapfError::InvalidInput(format!("two agents start on node {node}")));
        }
        if options.window_size == 0 {
            return Err(MapfError::InvalidInput("window size must be positive".to_string()));
        }
        if let Some(rt) = reservation_table {
            if rt.size() != self.env.size() {
                return Err(MapfError::InvalidInput(format!(
                    "reservation table of size {} does not match environment of size {}",
                    rt.size(),
                    self.env.size()
                )));
            }
            if let Some(&node) = starts.iter().find(|&&node| rt.is_reserved(0, node)) {
                return Err(MapfError::InvalidInput(format!(
                    "start node {node} is already reserved at time 0"
                )));
            }
        }
        Ok(())
    }

    fn plan(
        &mut self,
        agents: &mut [PlanningAgent<'a, E>],
        order: &[usize],
        options: &WhcaOptions,
        rt: &mut ReservationTable,
    ) -> std::result::Result<(), PlanFailure> {
        let edge_collision = self.env.edge_collision();

        let mut all_agents_done = false;
        while !all_agents_done {
            all_agents_done = true;
            self.stats.rounds += 1;

            for &index in order {
                let agent = &mut agents[index];
                let time = agent.path.len() - 1;
                let min_terminal_time = rt.last_time_reserved(agent.goal);

                // Resting on the goal with nobody passing through it later.
                if agent.position() == agent.goal && min_terminal_time.map_or(true, |t| t <= time) {
                    continue;
                }

                if let Some(reserved_until) = min_terminal_time.filter(|&t| t > options.max_length) {
                    return Err(PlanFailure::DeadlineExceeded {
                        agent: agent.id,
                        reserved_until,
                    });
                }

                let active_window = options.window_size.min(options.max_length.saturating_sub(time));
                if active_window == 0 {
                    return Err(PlanFailure::WindowCollapsed { agent: agent.id, time });
                }

                let path = self.st_a_star.find_path_with_depth_limit(
                    agent.position(),
                    agent.goal,
                    active_window,
                    Some(&*rt),
                    &mut agent.rrs,
                    min_terminal_time,
                    time,
                );
                if path.is_empty() {
                    return Err(PlanFailure::Blocked { agent: agent.id, time });
                }

                debug!("agent {} commits {path:?} at time {time}", agent.id);
                all_agents_done = false;
                agent.add_path(&path);
                rt.add_path(time, &path, false, edge_collision);
            }
        }

        Ok(())
    }
}

impl<E: Environment> MapfSolver for WHCAStar<'_, E> {
    fn mapf(&mut self, starts: &[NodeId], goals: &[NodeId]) -> Result<Option<Solution>> {
        let options = self.options.clone();
        self.mapf_with(starts, goals, &options, None)
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}

fn priority_order<E: Environment>(policy: &PriorityPolicy, agents: &mut [PlanningAgent<'_, E>]) -> Result<Vec<usize>> {
    let mut order: Vec<usize> = (0..agents.len()).collect();
    match policy {
        PriorityPolicy::InputOrder => {}
        PriorityPolicy::LongestFirst | PriorityPolicy::ShortestFirst => {
            let distances: Vec<f64> = agents
                .iter_mut()
                .map(|agent| agent.rrs.distance(agent.start))
                .collect();
            // Stable, so equal distances keep input order.
            order.sort_by(|&a, &b| {
                if *policy == PriorityPolicy::LongestFirst {
                    distances[b].total_cmp(&distances[a])
                } else {
                    distances[a].total_cmp(&distances[b])
                }
            });
        }
        PriorityPolicy::Fixed(permutation) => {
            let mut sorted = permutation.clone();
            sorted.sort_unstable();
            if sorted != order {
                return Err(MapfError::InvalidInput(format!(
                    "{permutation:?} is not a permutation of {} agents",
                    agents.len()
                )));
            }
            order = permutation.clone();
        }
    }
    Ok(order)
}
