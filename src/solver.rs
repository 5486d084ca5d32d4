mod whca;

pub use whca::{PlanFailure, PlanningAgent, PriorityPolicy, WhcaOptions, WHCAStar};

use crate::common::{NodeId, Solution};
use crate::error::Result;
use crate::stat::Stats;

/// Multi-agent path finding.
///
/// `Ok(Some(_))` is a plan (empty for zero agents), `Ok(None)` means planning
/// failed, `Err(_)` means the request itself was malformed.
pub trait MapfSolver {
    fn mapf(&mut self, starts: &[NodeId], goals: &[NodeId]) -> Result<Option<Solution>>;

    fn stats(&self) -> &Stats;
}
