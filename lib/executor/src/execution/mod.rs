pub mod plan;
mod targets;
