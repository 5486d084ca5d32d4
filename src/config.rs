use anyhow::anyhow;
use clap::Parser;
use serde::Deserialize;

use crate::solver::{PriorityPolicy, WhcaOptions};

#[derive(Parser, Debug, Default)]
#[command(
    name = "MAPF WHCA",
    about = "Bidirectional search and windowed cooperative MAPF in Rust.",
    version = "1.0"
)]
pub struct Cli {
    #[arg(long, help = "Path to a YAML config file")]
    pub config: Option<String>,

    #[arg(long, help = "Path to the scenario file")]
    pub scen_path: Option<String>,

    #[arg(long, help = "Path to the map file")]
    pub map_path: Option<String>,

    #[arg(long, help = "Path to the output file")]
    pub output_path: Option<String>,

    #[arg(long, help = "Load agents from a YAML file instead of the scenario")]
    pub agents_path: Option<String>,

    #[arg(long, help = "Number of agents")]
    pub num_agents: Option<usize>,

    #[arg(long, help = "Buckets to draw agents from", value_delimiter = ',')]
    pub agents_dist: Vec<usize>,

    #[arg(long, help = "Seed for the random number generator")]
    pub seed: Option<u64>,

    #[arg(long, help = "Solver to use: whca, biastar, bidijkstra or dijkstra")]
    pub solver: Option<String>,

    #[arg(long, help = "Deadline of the multi-agent plan")]
    pub max_length: Option<usize>,

    #[arg(long, help = "Planning window of each round")]
    pub window_size: Option<usize>,

    #[arg(long, help = "Agent priority: input_order, longest_first or shortest_first")]
    pub priority: Option<String>,

    #[arg(long, help = "Forbid agents from swapping positions")]
    pub edge_collision: Option<bool>,

    #[arg(long, help = "Cost of waiting one step on a tile")]
    pub pause_cost: Option<f64>,

    #[arg(long, help = "Tolerance of the bidirectional Dijkstra stopping test")]
    pub epsilon: Option<f64>,

    #[arg(long, help = "Dump the generated agents to debug.yaml", default_value_t = false)]
    pub debug_yaml: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub scen_path: String,
    pub map_path: String,
    pub output_path: String,
    pub agents_path: Option<String>,
    pub num_agents: usize,
    pub agents_dist: Vec<usize>,
    pub seed: u64,
    pub solver: String,
    pub max_length: usize,
    pub window_size: usize,
    pub priority: PriorityPolicy,
    pub edge_collision: bool,
    pub pause_cost: f64,
    pub epsilon: f64,
    pub debug_yaml: bool,
}

impl Default for Config {
    fn default() -> Self {
        let whca = WhcaOptions::default();
        Config {
            scen_path: "map_file/test/test.scen".to_string(),
            map_path: "map_file/test/test.map".to_string(),
            output_path: "result/result.json".to_string(),
            agents_path: None,
            num_agents: 2,
            agents_dist: Vec::new(),
            seed: 0,
            solver: "whca".to_string(),
            max_length: whca.max_length,
            window_size: whca.window_size,
            priority: whca.priority,
            edge_collision: false,
            pause_cost: 1.0,
            epsilon: crate::algorithm::DEFAULT_EPSILON,
            debug_yaml: false,
        }
    }
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(scen_path) = &cli.scen_path {
            self.scen_path = scen_path.clone();
        }
        if let Some(map_path) = &cli.map_path {
            self.map_path = map_path.clone();
        }
        if let Some(output_path) = &cli.output_path {
            self.output_path = output_path.clone();
        }
        if cli.agents_path.is_some() {
            self.agents_path = cli.agents_path.clone();
        }
        if let Some(num_agents) = cli.num_agents {
            self.num_agents = num_agents;
        }
        if !cli.agents_dist.is_empty() {
            self.agents_dist = cli.agents_dist.clone();
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if let Some(solver) = &cli.solver {
            self.solver = solver.clone();
        }
        if let Some(max_length) = cli.max_length {
            self.max_length = max_length;
        }
        if let Some(window_size) = cli.window_size {
            self.window_size = window_size;
        }
        if let Some(priority) = &cli.priority {
            self.priority = match priority.as_str() {
                "input_order" => PriorityPolicy::InputOrder,
                "longest_first" => PriorityPolicy::LongestFirst,
                "shortest_first" => PriorityPolicy::ShortestFirst,
                other => return Err(anyhow!("Unknown priority policy {other}")),
            };
        }
        if let Some(edge_collision) = cli.edge_collision {
            self.edge_collision = edge_collision;
        }
        if let Some(pause_cost) = cli.pause_cost {
            self.pause_cost = pause_cost;
        }
        if let Some(epsilon) = cli.epsilon {
            self.epsilon = epsilon;
        }
        self.debug_yaml |= cli.debug_yaml;

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        match self.solver.as_str() {
            "whca" | "biastar" | "bidijkstra" | "dijkstra" => {}
            other => return Err(anyhow!("Unknown solver {other}")),
        }

        if self.window_size == 0 {
            return Err(anyhow!("Window size must be positive"));
        }

        if !self.agents_dist.is_empty() && self.agents_dist.len() != self.num_agents {
            return Err(anyhow!(
                "Number of agents {} does not match the length of agents_dist {}",
                self.num_agents,
                self.agents_dist.len()
            ));
        }

        if !self.pause_cost.is_finite() || self.pause_cost < 0.0 {
            return Err(anyhow!("Pause cost must be non-negative, got {}", self.pause_cost));
        }

        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(anyhow!("Epsilon must be non-negative, got {}", self.epsilon));
        }
        Ok(())
    }

    pub fn whca_options(&self) -> WhcaOptions {
        WhcaOptions {
            max_length: self.max_length,
            window_size: self.window_size,
            priority: self.priority.clone(),
        }
    }
}
