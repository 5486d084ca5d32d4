use std::fs::File;
use std::io::{BufRead, BufReader};
use std::str::FromStr;

use crate::common::NodeId;
use crate::env::Environment;
use crate::error::{MapfError, Result};

#[derive(Debug, Clone)]
pub struct Tile {
    passable: bool,
    weight: f64,
    pause_weight: f64,
    pub neighbors: Vec<(NodeId, f64)>, // Stores accessible neighbors, including the tile itself
    pub predecessors: Vec<(NodeId, f64)>,
}

impl Tile {
    fn new(weight: f64) -> Self {
        Tile {
            passable: weight >= 0.0,
            weight,
            pause_weight: 1.0,
            neighbors: Vec::new(),
            predecessors: Vec::new(),
        }
    }

    pub fn is_passable(&self) -> bool {
        self.passable
    }

    /// Cost of leaving this tile towards a neighbor.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Cost of staying on this tile for one time step.
    pub fn pause_weight(&self) -> f64 {
        self.pause_weight
    }
}

/// 4-connected weighted grid, loaded from a MovingAI `.map` file or built
/// from a weight matrix.
///
/// Moving out of a cell costs that cell's weight, staying costs its pause
/// weight. A negative weight marks an obstacle.
#[derive(Debug, Clone)]
pub struct Map {
    pub height: usize,
    pub width: usize,
    pub grid: Vec<Tile>,
    min_weight: f64,
    edge_collision: bool,
}

impl Map {
    pub fn from_file(path: &str) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let lines = reader.lines().collect::<std::io::Result<Vec<String>>>()?;
        Self::from_lines(lines.iter().map(String::as_str))
    }

    fn from_lines<'a>(mut lines: impl Iterator<Item = &'a str>) -> Result<Self> {
        let _type = lines
            .next()
            .ok_or_else(|| MapfError::Parse("missing map type line".to_string()))?;
        let height = parse_header(lines.next(), "height")?;
        let width = parse_header(lines.next(), "width")?;
        let _map = lines
            .next()
            .ok_or_else(|| MapfError::Parse("missing map keyword".to_string()))?;

        let mut grid = Vec::with_capacity(height * width);
        for (row, line) in lines.take(height).enumerate() {
            let tiles: Vec<Tile> = line
                .trim_end()
                .chars()
                .map(|ch| Tile::new(if matches!(ch, '.' | 'G' | 'S') { 1.0 } else { -1.0 }))
                .collect();
            if tiles.len() != width {
                return Err(MapfError::Parse(format!(
                    "row {row} has {} tiles, expected {width}",
                    tiles.len()
                )));
            }
            grid.extend(tiles);
        }
        if grid.len() != height * width {
            return Err(MapfError::Parse(format!(
                "expected {height} rows, got {}",
                grid.len() / width.max(1)
            )));
        }

        Ok(Self::from_grid(height, width, grid))
    }

    /// Grid from row-major weights, `weights[row][column]`; negative entries are obstacles.
    pub fn from_weights(weights: &[Vec<f64>]) -> Result<Self> {
        let height = weights.len();
        let width = weights.first().map_or(0, Vec::len);
        let mut grid = Vec::with_capacity(height * width);
        for (row, line) in weights.iter().enumerate() {
            if line.len() != width {
                return Err(MapfError::InvalidInput(format!(
                    "weight row {row} has {} entries, expected {width}",
                    line.len()
                )));
            }
            for &weight in line {
                if !weight.is_finite() {
                    return Err(MapfError::InvalidInput(format!("invalid weight {weight}")));
                }
                grid.push(Tile::new(weight));
            }
        }

        Ok(Self::from_grid(height, width, grid))
    }

    fn from_grid(height: usize, width: usize, grid: Vec<Tile>) -> Self {
        let mut map = Map {
            height,
            width,
            grid,
            min_weight: 1.0,
            edge_collision: false,
        };
        map.initialize_neighbors();
        map
    }

    /// Same pause weight on every cell.
    pub fn set_pause_cost(&mut self, pause_cost: f64) -> Result<()> {
        check_weight(pause_cost)?;
        for tile in &mut self.grid {
            tile.pause_weight = pause_cost;
        }
        self.initialize_neighbors();
        Ok(())
    }

    /// Per-cell pause weights, `pause_weights[row][column]`.
    pub fn set_pause_weights(&mut self, pause_weights: &[Vec<f64>]) -> Result<()> {
        if pause_weights.len() != self.height
            || pause_weights.iter().any(|line| line.len() != self.width)
        {
            return Err(MapfError::InvalidInput(format!(
                "pause weights must be {}x{}",
                self.height, self.width
            )));
        }
        for &weight in pause_weights.iter().flatten() {
            check_weight(weight)?;
        }
        for (tile, &weight) in self.grid.iter_mut().zip(pause_weights.iter().flatten()) {
            tile.pause_weight = weight;
        }
        self.initialize_neighbors();
        Ok(())
    }

    pub fn set_edge_collision(&mut self, edge_collision: bool) {
        self.edge_collision = edge_collision;
    }

    fn initialize_neighbors(&mut self) {
        self.min_weight = self
            .grid
            .iter()
            .filter(|tile| tile.passable)
            .map(|tile| tile.weight)
            .fold(f64::INFINITY, f64::min);
        if !self.min_weight.is_finite() {
            self.min_weight = 0.0;
        }

        for tile in &mut self.grid {
            tile.predecessors.clear();
        }
        for x in 0..self.height {
            for y in 0..self.width {
                let node = self.node_id(x, y);
                let neighbors = if self.grid[node].passable {
                    self.get_neighbors(x, y)
                } else {
                    Vec::new()
                };
                for &(next, cost) in &neighbors {
                    self.grid[next].predecessors.push((node, cost));
                }
                self.grid[node].neighbors = neighbors;
            }
        }
    }

    pub fn get_neighbors(&self, x: usize, y: usize) -> Vec<(NodeId, f64)> {
        let directions = [(-1, 0), (1, 0), (0, -1), (0, 1), (0, 0)]; // Up, down, left, right, stay
        let tile = &self.grid[self.node_id(x, y)];
        let mut neighbors = Vec::new();

        for &(dx, dy) in &directions {
            let new_x = x as i64 + dx;
            let new_y = y as i64 + dy;
            if new_x >= 0
                && new_y >= 0
                && new_x < self.height as i64
                && new_y < self.width as i64
                && self.is_passable(new_x as usize, new_y as usize)
            {
                let cost = if (dx, dy) == (0, 0) {
                    tile.pause_weight
                } else {
                    tile.weight
                };
                neighbors.push((self.node_id(new_x as usize, new_y as usize), cost));
            }
        }

        neighbors
    }

    pub fn is_passable(&self, x: usize, y: usize) -> bool {
        self.grid[self.node_id(x, y)].is_passable()
    }

    /// Whether `node` is inside the map and not an obstacle.
    pub fn is_free(&self, node: NodeId) -> bool {
        self.grid.get(node).is_some_and(Tile::is_passable)
    }

    pub fn node_id(&self, x: usize, y: usize) -> NodeId {
        x * self.width + y
    }

    pub fn coords(&self, node: NodeId) -> (usize, usize) {
        (node / self.width, node % self.width)
    }
}

impl FromStr for Map {
    type Err = MapfError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_lines(s.lines())
    }
}

impl Environment for Map {
    fn size(&self) -> usize {
        self.grid.len()
    }

    fn edge_collision(&self) -> bool {
        self.edge_collision
    }

    fn neighbors(&self, node: NodeId) -> &[(NodeId, f64)] {
        &self.grid[node].neighbors
    }

    fn predecessors(&self, node: NodeId) -> &[(NodeId, f64)] {
        &self.grid[node].predecessors
    }

    fn estimate_distance(&self, from: NodeId, to: NodeId) -> f64 {
        // Manhattan distance scaled by the cheapest move
        let (x1, y1) = self.coords(from);
        let (x2, y2) = self.coords(to);
        (x1.abs_diff(x2) + y1.abs_diff(y2)) as f64 * self.min_weight
    }
}

fn check_weight(weight: f64) -> Result<()> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(MapfError::InvalidInput(format!("invalid pause weight {weight}")));
    }
    Ok(())
}

fn parse_header(line: Option<&str>, key: &str) -> Result<usize> {
    line.and_then(|line| line.split_whitespace().last())
        .and_then(|value| value.parse::<usize>().ok())
        .ok_or_else(|| MapfError::Parse(format!("invalid {key} header")))
}
