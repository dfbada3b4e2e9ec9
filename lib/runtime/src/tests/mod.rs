mod gateway;
mod schema_state;
pub mod testkit;
