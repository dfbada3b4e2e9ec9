#[derive(Debug, Clone, thiserror::Error)]
pub enum SupergraphError {
    #[error("Failed to parse schema: {0}")]
    SchemaParseError(String),
    #[error("Failed to parse operation: {0}")]
    OperationParseError(String),
    #[error("Subgraph \"{0}\" is not part of the supergraph")]
    UnknownSubgraph(String),
}
