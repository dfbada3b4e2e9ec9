pub mod error;
pub mod executor_registry;
pub mod gateway;
pub mod plan_cache;
pub mod schema_state;
pub mod supergraph;

#[cfg(test)]
mod tests;

pub use error::GatewayError;
pub use gateway::{Gateway, GatewayOptions, GatewayRequest};
pub use plan_cache::PlanCache;
pub use schema_state::{SchemaState, SupergraphData};
