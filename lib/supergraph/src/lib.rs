pub mod ast;
pub mod error;
pub mod extract;
pub mod fusion_spec;
pub mod metadata;
pub mod supergraph;

pub use error::SupergraphError;
pub use extract::extract_subgraph;
pub use metadata::{MetadataTable, SchemaElement};
pub use supergraph::{Supergraph, TransportEntry};
