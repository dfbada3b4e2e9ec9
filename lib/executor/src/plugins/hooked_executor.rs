use async_trait::async_trait;
use tracing::trace;

use crate::{
    executors::{
        common::{SubgraphExecutionRequest, SubgraphExecutor, SubgraphExecutorBoxedArc},
        error::SubgraphExecutorError,
    },
    plugins::{
        hooks::on_subgraph_execute::{
            OnSubgraphExecuteEndHookPayload, OnSubgraphExecuteStartHookPayload,
        },
        plugin_trait::{EndControlFlow, EndHookResult, GatewayPlugins, StartControlFlow},
    },
    response::subgraph_response::SubgraphResponse,
};

/// Runs the `on_subgraph_execute` hooks of every plugin around an executor.
pub struct HookedSubgraphExecutor {
    subgraph_name: String,
    executor: SubgraphExecutorBoxedArc,
    plugins: GatewayPlugins,
}

impl HookedSubgraphExecutor {
    pub fn new(
        subgraph_name: impl Into<String>,
        executor: SubgraphExecutorBoxedArc,
        plugins: GatewayPlugins,
    ) -> Self {
        Self {
            subgraph_name: subgraph_name.into(),
            executor,
            plugins,
        }
    }
}

/// Returns the executor as is when no plugin is registered.
pub fn wrap_with_hooks(
    subgraph_name: &str,
    executor: SubgraphExecutorBoxedArc,
    plugins: &GatewayPlugins,
) -> SubgraphExecutorBoxedArc {
    if plugins.is_empty() {
        return executor;
    }

    HookedSubgraphExecutor::new(subgraph_name, executor, plugins.clone()).to_boxed_arc()
}

#[async_trait]
impl SubgraphExecutor for HookedSubgraphExecutor {
    async fn execute(
        &self,
        execution_request: SubgraphExecutionRequest,
    ) -> Result<SubgraphResponse, SubgraphExecutorError> {
        let mut executor = self.executor.clone();
        let mut execution_request = execution_request;
        let mut on_end_callbacks = Vec::with_capacity(self.plugins.len());
        let mut early_response = None;

        for plugin in self.plugins.iter() {
            let result = plugin
                .on_subgraph_execute(OnSubgraphExecuteStartHookPayload {
                    subgraph_name: &self.subgraph_name,
                    executor,
                    execution_request,
                })
                .await;

            let (payload, control_flow) = result.into_parts();
            executor = payload.executor;
            execution_request = payload.execution_request;

            match control_flow {
                StartControlFlow::Proceed => {}
                StartControlFlow::EndWithResponse(response) => {
                    trace!(
                        subgraph = self.subgraph_name.as_str(),
                        plugin = plugin.plugin_name(),
                        "subgraph call short-circuited by plugin"
                    );
                    early_response = Some(response);
                    break;
                }
                StartControlFlow::OnEnd(callback) => on_end_callbacks.push(callback),
            }
        }

        let execution_result = match early_response {
            Some(response) => Ok(response),
            None => executor.execute(execution_request).await,
        };

        let mut end_payload = OnSubgraphExecuteEndHookPayload {
            subgraph_name: &self.subgraph_name,
            execution_result,
        };

        for callback in on_end_callbacks {
            let EndHookResult {
                payload,
                control_flow,
            } = callback(end_payload);
            end_payload = payload;

            if let EndControlFlow::EndWithResponse(response) = control_flow {
                end_payload.execution_result = Ok(response);
            }
        }

        end_payload.execution_result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use http::HeaderValue;
    use serde_json::json;

    use super::*;
    use crate::{
        plugins::{
            hooks::on_subgraph_execute::OnSubgraphExecuteStartHookResult,
            plugin_trait::{EndHookPayload, GatewayPlugin, StartHookPayload},
        },
        tests::testkit::{request_for, MockSubgraphExecutor},
    };

    struct RecordingPlugin {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl GatewayPlugin for RecordingPlugin {
        fn plugin_name(&self) -> &'static str {
            self.name
        }

        async fn on_subgraph_execute<'exec>(
            &'exec self,
            mut payload: OnSubgraphExecuteStartHookPayload<'exec>,
        ) -> OnSubgraphExecuteStartHookResult<'exec> {
            self.log
                .lock()
                .unwrap()
                .push(format!("start {} {}", self.name, payload.subgraph_name));
            payload
                .execution_request
                .headers
                .insert("x-plugin", HeaderValue::from_static(self.name));

            let log = self.log.clone();
            let name = self.name;
            payload.on_end(move |payload| {
                log.lock().unwrap().push(format!("end {}", name));
                payload.proceed()
            })
        }
    }

    struct ShortCircuitPlugin;

    #[async_trait]
    impl GatewayPlugin for ShortCircuitPlugin {
        fn plugin_name(&self) -> &'static str {
            "short-circuit"
        }

        async fn on_subgraph_execute<'exec>(
            &'exec self,
            payload: OnSubgraphExecuteStartHookPayload<'exec>,
        ) -> OnSubgraphExecuteStartHookResult<'exec> {
            payload.end_with_response(SubgraphResponse::with_data(json!({ "cached": true })))
        }
    }

    #[tokio::test]
    async fn start_and_end_hooks_run_in_registration_order() {
        let log = Arc::new(Mutex::new(vec![]));
        let plugins: GatewayPlugins = Arc::new(vec![
            Arc::new(RecordingPlugin {
                name: "first",
                log: log.clone(),
            }),
            Arc::new(RecordingPlugin {
                name: "second",
                log: log.clone(),
            }),
        ]);

        let mock = MockSubgraphExecutor::responding(json!({ "a": "a" }));
        let executor = wrap_with_hooks("a", mock.clone().to_boxed_arc(), &plugins);
        let response = executor.execute(request_for("a", "{ a }")).await.unwrap();

        assert_eq!(response.data, json!({ "a": "a" }));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["start first a", "start second a", "end first", "end second"]
        );

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].headers.get("x-plugin").unwrap(), "second");
    }

    #[tokio::test]
    async fn start_hook_can_answer_without_calling_the_subgraph() {
        let log = Arc::new(Mutex::new(vec![]));
        let plugins: GatewayPlugins = Arc::new(vec![
            Arc::new(RecordingPlugin {
                name: "first",
                log: log.clone(),
            }),
            Arc::new(ShortCircuitPlugin),
            Arc::new(RecordingPlugin {
                name: "never",
                log: log.clone(),
            }),
        ]);

        let mock = MockSubgraphExecutor::responding(json!({ "a": "a" }));
        let executor = wrap_with_hooks("a", mock.clone().to_boxed_arc(), &plugins);
        let response = executor.execute(request_for("a", "{ a }")).await.unwrap();

        assert_eq!(response.data, json!({ "cached": true }));
        assert!(mock.calls().is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["start first a", "end first"]);
    }

    struct ReplaceFailurePlugin;

    #[async_trait]
    impl GatewayPlugin for ReplaceFailurePlugin {
        fn plugin_name(&self) -> &'static str {
            "replace-failure"
        }

        async fn on_subgraph_execute<'exec>(
            &'exec self,
            payload: OnSubgraphExecuteStartHookPayload<'exec>,
        ) -> OnSubgraphExecuteStartHookResult<'exec> {
            payload.on_end(|payload| {
                if payload.execution_result.is_err() {
                    return payload.end_with_response(SubgraphResponse::with_data(
                        json!({ "a": "fallback" }),
                    ));
                }
                payload.proceed()
            })
        }
    }

    #[tokio::test]
    async fn end_hook_can_replace_a_failed_result() {
        let plugins: GatewayPlugins = Arc::new(vec![Arc::new(ReplaceFailurePlugin)]);
        let mock = MockSubgraphExecutor::failing("a");
        let executor = wrap_with_hooks("a", mock.to_boxed_arc(), &plugins);

        let response = executor.execute(request_for("a", "{ a }")).await.unwrap();
        assert_eq!(response.data, json!({ "a": "fallback" }));
    }
}
