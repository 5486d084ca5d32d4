use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub costs: f64,
    pub time_ms: usize,
    pub expanded_nodes: usize,
    pub heuristic_expanded_nodes: usize,
    pub rounds: usize,
}

impl Stats {
    pub fn print(&self, solver: &str) {
        info!(
            "{solver}: Cost {:?} Time(microseconds) {:?} Expanded nodes {:?} Heuristic expanded nodes {:?} Rounds {:?}",
            self.costs, self.time_ms, self.expanded_nodes, self.heuristic_expanded_nodes, self.rounds
        );
    }
}
