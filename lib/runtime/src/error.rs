use fusion_plan_executor::response::graphql_error::GraphQLError;
use fusion_query_planner::PlanningError;

/// Request-level failures. Nothing was sent to any subgraph when one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Supergraph is not loaded yet")]
    SupergraphNotReady,
    #[error("Failed to parse operation: {0}")]
    ParseFailure(String),
    #[error(transparent)]
    PlanningFailure(#[from] PlanningError),
    #[error("Introspection is disabled")]
    IntrospectionDisabled,
}

impl GatewayError {
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::SupergraphNotReady => "SUPERGRAPH_NOT_READY",
            GatewayError::ParseFailure(_) => "GRAPHQL_PARSE_FAILED",
            GatewayError::PlanningFailure(err) => err.code(),
            GatewayError::IntrospectionDisabled => "INTROSPECTION_DISABLED",
        }
    }
}

impl From<GatewayError> for GraphQLError {
    fn from(error: GatewayError) -> Self {
        GraphQLError::from(error.to_string()).with_code(error.error_code())
    }
}
