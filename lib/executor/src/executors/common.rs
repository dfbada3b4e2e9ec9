use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderMap;
use serde_json::{Map, Value};

use crate::{
    context::RequestContext, executors::error::SubgraphExecutorError,
    response::subgraph_response::SubgraphResponse,
};

#[async_trait]
pub trait SubgraphExecutor {
    async fn execute(
        &self,
        execution_request: SubgraphExecutionRequest,
    ) -> Result<SubgraphResponse, SubgraphExecutorError>;

    fn to_boxed_arc<'a>(self) -> Arc<Box<dyn SubgraphExecutor + Send + Sync + 'a>>
    where
        Self: Sized + Send + Sync + 'a,
    {
        Arc::new(Box::new(self))
    }
}

pub type SubgraphExecutorType = dyn crate::executors::common::SubgraphExecutor + Send + Sync;

pub type SubgraphExecutorBoxedArc = Arc<Box<SubgraphExecutorType>>;

/// One call to one subgraph.
#[derive(Debug, Clone)]
pub struct SubgraphExecutionRequest {
    pub subgraph_name: String,
    pub query: String,
    pub operation_name: Option<String>,
    pub variables: Map<String, Value>,
    /// Extra headers for this call, usually set by hooks.
    pub headers: HeaderMap,
    pub context: Arc<RequestContext>,
}

/// Hands out the executor of a subgraph by name.
#[async_trait]
pub trait SubgraphExecutorResolver: Send + Sync {
    async fn get_executor(
        &self,
        subgraph_name: &str,
    ) -> Result<SubgraphExecutorBoxedArc, SubgraphExecutorError>;
}
