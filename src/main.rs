use mapf_whca::algorithm::{BiAStar, BiDijkstra, Dijkstra, PathFinder};
use mapf_whca::common::{Agent, Solution};
use mapf_whca::config::{Cli, Config};
use mapf_whca::map::Map;
use mapf_whca::scenario::Scenario;
use mapf_whca::solver::{MapfSolver, WHCAStar};
use mapf_whca::stat::Stats;

use anyhow::{anyhow, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path as FsPath;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let config = if let Some(config_file) = cli.config.as_ref() {
        let config_str = fs::read_to_string(config_file)
            .with_context(|| format!("cannot read config file: {config_file}"))?;
        Config::from_yaml_str(&config_str)
            .with_context(|| format!("error with config file: {config_file}"))?
    } else {
        info!("No config file specified, using default config");
        Config::default()
    }
    .override_from_command_line(&cli)?;

    let mut map = Map::from_file(&config.map_path)
        .with_context(|| format!("error loading map: {}", config.map_path))?;
    map.set_pause_cost(config.pause_cost)?;
    map.set_edge_collision(config.edge_collision);

    let agents = load_agents(&config, &map)?;
    if config.debug_yaml {
        Scenario::write_agents_to_yaml("debug.yaml", &agents)?;
    }

    let (solution, stats) = solve(&config, &map, &agents)?;
    stats.print(&config.solver);

    match solution {
        Some(solution) => {
            if config.solver == "whca" && !solution.verify(&map, &agents) {
                return Err(anyhow!("{} produced an invalid plan", config.solver));
            }
            info!(
                "{} solution: makespan {} cost {:?}",
                config.solver,
                solution.makespan(),
                solution.cost(&map)
            );
            write_solution(&config.output_path, &solution)?;
        }
        None => error!("{} solve fails", config.solver),
    }

    Ok(())
}

fn load_agents(config: &Config, map: &Map) -> anyhow::Result<Vec<Agent>> {
    if let Some(agents_path) = &config.agents_path {
        return Scenario::load_agents_from_yaml(agents_path, map)
            .with_context(|| format!("error loading agents: {agents_path}"));
    }

    let scenario = Scenario::load_from_scen(&config.scen_path)
        .with_context(|| format!("error loading scenario: {}", config.scen_path))?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let agents = if config.agents_dist.is_empty() {
        scenario.generate_agents_randomly(map, config.num_agents, &mut rng)?
    } else {
        scenario.generate_agents_by_buckets(map, &config.agents_dist, &mut rng)?
    };
    Ok(agents)
}

fn solve(config: &Config, map: &Map, agents: &[Agent]) -> anyhow::Result<(Option<Solution>, Stats)> {
    let starts: Vec<_> = agents.iter().map(|agent| agent.start).collect();
    let goals: Vec<_> = agents.iter().map(|agent| agent.goal).collect();

    match config.solver.as_str() {
        "whca" => {
            let mut solver = WHCAStar::with_options(map, config.whca_options());
            let solution = solver.mapf(&starts, &goals)?;
            Ok((solution, solver.stats().clone()))
        }
        "biastar" => Ok(solve_independently(&mut BiAStar::new(map), &starts, &goals)),
        "bidijkstra" => {
            let mut finder = BiDijkstra::new(map).with_epsilon(config.epsilon);
            Ok(solve_independently(&mut finder, &starts, &goals))
        }
        "dijkstra" => Ok(solve_independently(&mut Dijkstra::new(map), &starts, &goals)),
        other => Err(anyhow!("Unknown solver {other}")),
    }
}

// Shortest path per agent, ignoring the others.
fn solve_independently<F: PathFinder>(
    finder: &mut F,
    starts: &[usize],
    goals: &[usize],
) -> (Option<Solution>, Stats) {
    let total_solve_start_time = Instant::now();
    let mut stats = Stats::default();
    let mut paths = Vec::with_capacity(starts.len());
    for (&start, &goal) in starts.iter().zip(goals) {
        let path = finder.find_path(start, goal);
        stats.expanded_nodes += finder.stats().expanded_nodes;
        if path.is_empty() {
            stats.time_ms = total_solve_start_time.elapsed().as_micros() as usize;
            return (None, stats);
        }
        stats.costs += finder.stats().costs;
        paths.push(path);
    }
    stats.time_ms = total_solve_start_time.elapsed().as_micros() as usize;
    (Some(Solution { paths }), stats)
}

fn write_solution(output_path: &str, solution: &Solution) -> anyhow::Result<()> {
    if let Some(parent) = FsPath::new(output_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(output_path).with_context(|| format!("cannot create {output_path}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), solution)?;
    info!("Solution written to {output_path}");
    Ok(())
}
