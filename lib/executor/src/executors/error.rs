use std::time::Duration;

use crate::response::graphql_error::GraphQLError;

#[derive(thiserror::Error, Debug, Clone)]
pub enum SubgraphExecutorError {
    #[error("Failed to send request to subgraph \"{0}\": {1}")]
    RequestFailure(String, String),
    #[error("Subgraph \"{0}\" responded with status {1}")]
    UnexpectedStatus(String, u16),
    #[error("Failed to parse response of subgraph \"{0}\": {1}")]
    ResponseParseFailure(String, String),
    #[error("Request timed out after {0:?}")]
    RequestTimeout(Duration),
    #[error("No executor registered for subgraph \"{0}\"")]
    UnknownSubgraph(String),
    #[error("Subgraph \"{subgraph}\" uses transport \"{kind}\" which has no registered factory")]
    UnsupportedTransport { subgraph: String, kind: String },
    #[error("Invalid option \"{option}\" for transport of subgraph \"{subgraph}\": {reason}")]
    InvalidTransportOption {
        subgraph: String,
        option: String,
        reason: String,
    },
    #[error("Failed to build executor of subgraph \"{0}\": {1}")]
    ExecutorBuildFailure(String, String),
}

impl SubgraphExecutorError {
    pub fn error_code(&self) -> &'static str {
        match self {
            SubgraphExecutorError::RequestFailure(_, _)
            | SubgraphExecutorError::UnexpectedStatus(_, _)
            | SubgraphExecutorError::ResponseParseFailure(_, _)
            | SubgraphExecutorError::RequestTimeout(_) => "SUBGRAPH_CALL_ERROR",
            SubgraphExecutorError::UnknownSubgraph(_)
            | SubgraphExecutorError::UnsupportedTransport { .. }
            | SubgraphExecutorError::InvalidTransportOption { .. }
            | SubgraphExecutorError::ExecutorBuildFailure(_, _) => "SUBGRAPH_EXECUTOR_UNAVAILABLE",
        }
    }
}

impl From<SubgraphExecutorError> for GraphQLError {
    fn from(error: SubgraphExecutorError) -> Self {
        GraphQLError::from(error.to_string()).with_code(error.error_code())
    }
}
