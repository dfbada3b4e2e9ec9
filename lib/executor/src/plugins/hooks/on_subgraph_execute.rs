use crate::{
    executors::{
        common::{SubgraphExecutionRequest, SubgraphExecutorBoxedArc},
        error::SubgraphExecutorError,
    },
    plugins::plugin_trait::{EndHookPayload, EndHookResult, StartHookPayload, StartHookResult},
    response::{graphql_error::GraphQLError, subgraph_response::SubgraphResponse},
};

pub struct OnSubgraphExecuteStartHookPayload<'exec> {
    pub subgraph_name: &'exec str,
    /// The executor about to be called. A hook may swap it.
    pub executor: SubgraphExecutorBoxedArc,
    pub execution_request: SubgraphExecutionRequest,
}

impl<'exec> StartHookPayload<OnSubgraphExecuteEndHookPayload<'exec>, SubgraphResponse>
    for OnSubgraphExecuteStartHookPayload<'exec>
{
}

pub type OnSubgraphExecuteStartHookResult<'exec> = StartHookResult<
    'exec,
    OnSubgraphExecuteStartHookPayload<'exec>,
    OnSubgraphExecuteEndHookPayload<'exec>,
    SubgraphResponse,
>;

pub struct OnSubgraphExecuteEndHookPayload<'exec> {
    pub subgraph_name: &'exec str,
    pub execution_result: Result<SubgraphResponse, SubgraphExecutorError>,
}

impl<'exec> EndHookPayload<SubgraphResponse> for OnSubgraphExecuteEndHookPayload<'exec> {}

pub type OnSubgraphExecuteEndHookResult<'exec> =
    EndHookResult<OnSubgraphExecuteEndHookPayload<'exec>, SubgraphResponse>;

impl From<GraphQLError> for SubgraphResponse {
    fn from(error: GraphQLError) -> Self {
        SubgraphResponse::from_graphql_error(error)
    }
}
