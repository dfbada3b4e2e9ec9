use std::sync::Arc;

use crate::{
    plugins::hooks::on_subgraph_execute::{
        OnSubgraphExecuteStartHookPayload, OnSubgraphExecuteStartHookResult,
    },
    response::graphql_error::GraphQLError,
};

/// Left behind by a start hook, called with the outcome of the wrapped operation.
pub type OnEndCallback<'exec, TEnd, TResponse> =
    Box<dyn FnOnce(TEnd) -> EndHookResult<TEnd, TResponse> + Send + 'exec>;

/// What a start hook hands back: the (possibly edited) payload and how to continue.
pub struct StartHookResult<'exec, TStart, TEnd, TResponse> {
    pub payload: TStart,
    pub control_flow: StartControlFlow<'exec, TEnd, TResponse>,
}

pub enum StartControlFlow<'exec, TEnd, TResponse> {
    Proceed,
    /// Skip the operation and every later start hook.
    EndWithResponse(TResponse),
    OnEnd(OnEndCallback<'exec, TEnd, TResponse>),
}

impl<'exec, TStart, TEnd, TResponse> StartHookResult<'exec, TStart, TEnd, TResponse> {
    fn with(payload: TStart, control_flow: StartControlFlow<'exec, TEnd, TResponse>) -> Self {
        Self {
            payload,
            control_flow,
        }
    }

    pub fn into_parts(self) -> (TStart, StartControlFlow<'exec, TEnd, TResponse>) {
        (self.payload, self.control_flow)
    }
}

/// Builders available on every start payload.
pub trait StartHookPayload<TEnd, TResponse>: Sized
where
    TEnd: EndHookPayload<TResponse>,
    TResponse: From<GraphQLError>,
{
    fn proceed<'exec>(self) -> StartHookResult<'exec, Self, TEnd, TResponse> {
        StartHookResult::with(self, StartControlFlow::Proceed)
    }

    fn end_with_response<'exec>(
        self,
        response: TResponse,
    ) -> StartHookResult<'exec, Self, TEnd, TResponse> {
        StartHookResult::with(self, StartControlFlow::EndWithResponse(response))
    }

    fn end_with_graphql_error<'exec>(
        self,
        error: GraphQLError,
    ) -> StartHookResult<'exec, Self, TEnd, TResponse> {
        self.end_with_response(error.into())
    }

    fn on_end<'exec, F>(self, callback: F) -> StartHookResult<'exec, Self, TEnd, TResponse>
    where
        F: FnOnce(TEnd) -> EndHookResult<TEnd, TResponse> + Send + 'exec,
    {
        StartHookResult::with(self, StartControlFlow::OnEnd(Box::new(callback)))
    }
}

pub struct EndHookResult<TEnd, TResponse> {
    pub payload: TEnd,
    pub control_flow: EndControlFlow<TResponse>,
}

pub enum EndControlFlow<TResponse> {
    Proceed,
    /// Replace the outcome. Later end callbacks still run and see the replacement.
    EndWithResponse(TResponse),
}

pub trait EndHookPayload<TResponse>: Sized
where
    TResponse: From<GraphQLError>,
{
    fn proceed(self) -> EndHookResult<Self, TResponse> {
        EndHookResult {
            payload: self,
            control_flow: EndControlFlow::Proceed,
        }
    }

    fn end_with_response(self, response: TResponse) -> EndHookResult<Self, TResponse> {
        EndHookResult {
            payload: self,
            control_flow: EndControlFlow::EndWithResponse(response),
        }
    }

    fn end_with_graphql_error(self, error: GraphQLError) -> EndHookResult<Self, TResponse> {
        self.end_with_response(error.into())
    }
}

/// Extension point of the gateway. Every hook defaults to proceeding untouched.
///
/// Start hooks of all plugins run in registration order before the subgraph call. The
/// `on_end` callbacks they return run afterwards, in that same order.
#[async_trait::async_trait]
pub trait GatewayPlugin: Send + Sync + 'static {
    fn plugin_name(&self) -> &'static str;

    async fn on_subgraph_execute<'exec>(
        &'exec self,
        start_payload: OnSubgraphExecuteStartHookPayload<'exec>,
    ) -> OnSubgraphExecuteStartHookResult<'exec> {
        start_payload.proceed()
    }
}

pub type GatewayPlugins = Arc<Vec<Arc<dyn GatewayPlugin>>>;
