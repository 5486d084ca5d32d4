use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use tracing::info;

use crate::common::Agent;
use crate::error::{MapfError, Result};
use crate::map::Map;

/// Endpoints of one benchmark entry as `(row, column)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Route {
    pub start_x: usize,
    pub start_y: usize,
    pub goal_x: usize,
    pub goal_y: usize,
}

/// MovingAI `.scen` benchmark, routes grouped by bucket.
#[derive(Debug, Default)]
pub struct Scenario {
    pub map: String,
    pub map_width: usize,
    pub map_height: usize,
    pub buckets: HashMap<usize, Vec<Route>>,
}

impl Scenario {
    pub fn load_from_scen(path: &str) -> Result<Scenario> {
        let lines = BufReader::new(File::open(path)?)
            .lines()
            .collect::<io::Result<Vec<String>>>()?;
        Self::parse(lines.iter().map(String::as_str))
    }

    fn parse<'a>(mut lines: impl Iterator<Item = &'a str>) -> Result<Scenario> {
        lines
            .next()
            .filter(|header| header.starts_with("version"))
            .ok_or_else(|| MapfError::Parse("missing version header".to_string()))?;

        let mut scenario = Scenario::default();

        for line in lines.filter(|line| !line.trim().is_empty()) {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 8 {
                return Err(MapfError::Parse(format!("malformed scenario line: {line}")));
            }
            let field = |index: usize| -> Result<usize> {
                parts[index]
                    .parse()
                    .map_err(|_| MapfError::Parse(format!("invalid field {index} in line: {line}")))
            };

            let bucket_index = field(0)?;
            // Scenario columns are (x = column, y = row), routes store (row, column).
            let route = Route {
                start_x: field(5)?,
                start_y: field(4)?,
                goal_x: field(7)?,
                goal_y: field(6)?,
            };

            if scenario.map.is_empty() {
                scenario.map = parts[1].to_string();
                scenario.map_width = field(2)?;
                scenario.map_height = field(3)?;
            }

            scenario.buckets.entry(bucket_index).or_default().push(route);
        }

        Ok(scenario)
    }

    fn to_agent(map: &Map, id: usize, route: &Route) -> Result<Agent> {
        for (x, y) in [(route.start_x, route.start_y), (route.goal_x, route.goal_y)] {
            if x >= map.height || y >= map.width || !map.is_passable(x, y) {
                return Err(MapfError::InvalidInput(format!(
                    "route endpoint ({x}, {y}) is not a free cell of the map"
                )));
            }
        }
        Ok(Agent {
            id,
            start: map.node_id(route.start_x, route.start_y),
            goal: map.node_id(route.goal_x, route.goal_y),
        })
    }

    /// One agent per entry of `agent_buckets`, each drawn from that bucket
    /// without reusing a route.
    pub fn generate_agents_by_buckets<R: Rng + ?Sized>(
        &self,
        map: &Map,
        agent_buckets: &[usize],
        rng: &mut R,
    ) -> Result<Vec<Agent>> {
        let mut taken: HashSet<(usize, usize)> = HashSet::new();
        let mut agents = Vec::with_capacity(agent_buckets.len());

        for (id, &bucket_index) in agent_buckets.iter().enumerate() {
            let routes = self.buckets.get(&bucket_index).ok_or_else(|| {
                MapfError::InvalidInput(format!("scenario has no bucket {bucket_index}"))
            })?;

            let free: Vec<usize> = (0..routes.len())
                .filter(|&route| !taken.contains(&(bucket_index, route)))
                .collect();
            let &route = free.choose(rng).ok_or_else(|| {
                MapfError::InvalidInput(format!("bucket {bucket_index} has no unused route left"))
            })?;

            taken.insert((bucket_index, route));
            agents.push(Self::to_agent(map, id, &routes[route])?);
        }

        info!("agents from buckets {agent_buckets:?}: {agents:?}");
        Ok(agents)
    }

    /// `num_agents` distinct routes picked uniformly, skipping routes whose
    /// start or goal is already used by another agent.
    pub fn generate_agents_randomly<R: Rng + ?Sized>(
        &self,
        map: &Map,
        num_agents: usize,
        rng: &mut R,
    ) -> Result<Vec<Agent>> {
        let mut candidates: Vec<&Route> = self.buckets.values().flatten().collect();
        candidates.sort_unstable();
        candidates.dedup();
        candidates.shuffle(rng);

        let mut starts = HashSet::new();
        let mut goals = HashSet::new();
        let mut agents = Vec::with_capacity(num_agents);
        for route in candidates {
            if agents.len() == num_agents {
                break;
            }
            let agent = Self::to_agent(map, agents.len(), route)?;
            if starts.contains(&agent.start) || goals.contains(&agent.goal) {
                continue;
            }
            starts.insert(agent.start);
            goals.insert(agent.goal);
            agents.push(agent);
        }

        if agents.len() < num_agents {
            return Err(MapfError::InvalidInput(format!(
                "only {} routes with distinct endpoints, {num_agents} agents requested",
                agents.len()
            )));
        }

        info!("random agents: {agents:?}");
        Ok(agents)
    }

    /// Agents dumped by `write_agents_to_yaml`, checked against `map`.
    pub fn load_agents_from_yaml(path: &str, map: &Map) -> anyhow::Result<Vec<Agent>> {
        let agents: Vec<Agent> = serde_yaml::from_reader(BufReader::new(File::open(path)?))?;
        for agent in &agents {
            for node in [agent.start, agent.goal] {
                if !map.is_free(node) {
                    return Err(MapfError::InvalidInput(format!(
                        "agent {} uses node {node}, which is not a free cell of the map",
                        agent.id
                    ))
                    .into());
                }
            }
        }
        Ok(agents)
    }

    pub fn write_agents_to_yaml(path: &str, agents: &[Agent]) -> anyhow::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_yaml::to_writer(&mut writer, agents)?;
        writer.flush()?;
        Ok(())
    }
}
