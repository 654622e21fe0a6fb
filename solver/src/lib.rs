pub mod fix_and_relax;
pub mod flow_model;
pub mod greedy_backend;
pub mod milp;
#[cfg(test)]
mod test_utilities;

pub use fix_and_relax::{FixAndRelax, PartitionState, ScheduleOutcome};
pub use flow_model::{FlowModel, VariableId, HEADCOUNT_CONSTRAINT};
pub use greedy_backend::GreedyBackend;
pub use milp::{Assignment, MilpSolver, SolveError};
