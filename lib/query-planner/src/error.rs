#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanningError {
    #[error("Must provide operation name if query contains multiple operations")]
    AmbiguousOperation,
    #[error("No operation found with name {0}")]
    OperationNotFound(String),
    #[error("No operation found in the document")]
    MissingOperation,
    #[error("Supergraph has no root type for {0} operations")]
    UnresolvedRootType(String),
    #[error("Unknown fragment \"{0}\"")]
    UnknownFragment(String),
    #[error("Cannot query field \"{field}\" on type \"{type_name}\"")]
    UnknownField { type_name: String, field: String },
    #[error("Unknown argument \"{argument}\" on field \"{type_name}.{field}\"")]
    UnknownArgument {
        type_name: String,
        field: String,
        argument: String,
    },
    #[error("Field \"{type_name}.{field}\" cannot be resolved from subgraph \"{subgraph}\" or any other subgraph")]
    UnresolvableField {
        type_name: String,
        field: String,
        subgraph: String,
    },
    #[error("Root field \"{type_name}.{field}\" has no resolver")]
    MissingRootResolver { type_name: String, field: String },
    #[error("Resolver operation of subgraph \"{subgraph}\" is invalid: {reason}")]
    InvalidResolverOperation { subgraph: String, reason: String },
    #[error("Variable \"${variable}\" used by resolver #{node} has no producer")]
    UnboundVariable { variable: String, node: usize },
    #[error("Variable \"${variable}\" used by resolver #{node} has more than one producer")]
    DuplicateVariableProducer { variable: String, node: usize },
    #[error("Resolver dependencies form a cycle")]
    PlanCycle,
}

impl PlanningError {
    /// Stable error code exposed to clients under `extensions.code`.
    pub fn code(&self) -> &'static str {
        match self {
            PlanningError::AmbiguousOperation
            | PlanningError::OperationNotFound(_)
            | PlanningError::MissingOperation => "OPERATION_RESOLUTION_FAILURE",
            PlanningError::UnknownFragment(_)
            | PlanningError::UnknownField { .. }
            | PlanningError::UnknownArgument { .. } => {
                "GRAPHQL_VALIDATION_FAILED"
            }
            _ => "QUERY_PLAN_BUILD_FAILED",
        }
    }
}
