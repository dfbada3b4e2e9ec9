pub mod context;
pub mod execution;
pub mod executors;
pub mod introspection;
pub mod plugins;
pub mod response;
pub mod variables;

#[cfg(test)]
mod tests;

pub use context::RequestContext;
pub use execution::plan::{execute_plan, PlanExecutionOutput};
pub use executors::map::SubgraphExecutorMap;
pub use plugins::*;
