#[derive(Debug, Clone, thiserror::Error)]
pub enum CompositionError {
    #[error("Subgraph \"{0}\" is defined more than once")]
    DuplicateSubgraph(String),
    #[error("Type \"{type_name}\" is defined as {existing} and as {incoming} in subgraph \"{subgraph}\"")]
    TypeKindConflict {
        type_name: String,
        existing: String,
        incoming: String,
        subgraph: String,
    },
}
