pub mod compiler;
pub mod error;
pub mod flatten;
pub mod operation;
pub mod plan_nodes;
pub mod planner;
pub mod utils;

#[cfg(test)]
mod tests;

pub use compiler::{build_plan, compile_plan, CompiledPlan, ExecutableResolverOperationNode};
pub use error::PlanningError;
pub use plan_nodes::{BindingSource, ExportedVariable, MetaField, Plan, VariableBinding};
pub use planner::plan_operation;
