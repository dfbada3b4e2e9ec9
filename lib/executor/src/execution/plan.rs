use std::sync::Arc;

use fusion_query_planner::{
    utils::pretty_display::compact, BindingSource, CompiledPlan, ExecutableResolverOperationNode,
};
use fusion_supergraph::{fusion_spec::ResolverKind, Supergraph};
use futures::{
    future::{join_all, BoxFuture},
    stream::FuturesUnordered,
    FutureExt, StreamExt,
};
use http::HeaderMap;
use serde_json::{Map, Value};
use tracing::{debug, instrument, trace};

use crate::{
    context::RequestContext,
    execution::targets::{
        collect_targets, extract_result, strip_internal_fields, value_at, value_at_mut,
        ResponsePath,
    },
    executors::{
        common::{SubgraphExecutionRequest, SubgraphExecutorResolver},
        error::SubgraphExecutorError,
    },
    introspection::{resolve_meta_field, IntrospectionContext},
    response::{
        graphql_error::{GraphQLError, GraphQLErrorPathSegment},
        merge::deep_merge,
        response::GraphQLResponse,
        subgraph_response::SubgraphResponse,
    },
    variables::{resolve_value, seed_variables},
};

/// Result of running a plan.
#[derive(Debug, Default)]
pub struct PlanExecutionOutput {
    pub data: Value,
    pub errors: Vec<GraphQLError>,
    /// Operation variables plus every value exported along the way.
    pub captured: Map<String, Value>,
}

impl PlanExecutionOutput {
    pub fn into_response(self) -> GraphQLResponse {
        GraphQLResponse {
            data: self.data,
            errors: self.errors,
            extensions: None,
        }
    }
}

/// One subgraph call prepared from the current response tree.
struct PreparedCall {
    variables: Map<String, Value>,
    /// Target index, plus the position in a batched result list.
    targets: Vec<(usize, Option<usize>)>,
}

struct ExecutionJob {
    node: usize,
    targets: Vec<ResponsePath>,
    /// Targets lacking a value the call needs.
    unresolved: Vec<usize>,
    results: Vec<(Vec<(usize, Option<usize>)>, Result<SubgraphResponse, SubgraphExecutorError>)>,
}

struct ExecutionState {
    data: Value,
    errors: Vec<GraphQLError>,
    captured: Map<String, Value>,
    remaining: Vec<usize>,
}

struct Executor<'a> {
    plan: &'a CompiledPlan,
    executors: &'a dyn SubgraphExecutorResolver,
    context: Arc<RequestContext>,
}

/// Runs a compiled plan.
///
/// Every node whose prerequisites completed is in flight at the same time. State is only
/// touched between completions, so no locking is involved, and a plan whose subgraph calls
/// never suspend finishes on the first poll.
#[instrument(
    level = "debug",
    skip_all,
    fields(operation_name = plan.operation_name.as_deref(), nodes = plan.nodes.len())
)]
pub async fn execute_plan(
    plan: &CompiledPlan,
    supergraph: &Supergraph,
    variables: Option<&Map<String, Value>>,
    executors: &dyn SubgraphExecutorResolver,
    context: Arc<RequestContext>,
) -> PlanExecutionOutput {
    let captured = seed_variables(
        &plan.default_variables,
        variables,
        &plan.operation_variables,
    );

    let mut data = Map::with_capacity(plan.root_response_keys.len());
    for key in &plan.root_response_keys {
        data.insert(key.clone(), Value::Null);
    }

    if !plan.meta_fields.is_empty() {
        let root_type_name = supergraph
            .root_type_name(plan.operation_kind)
            .unwrap_or(plan.operation_kind.root_type_name());
        let introspection = IntrospectionContext::new(supergraph, &captured);
        for meta_field in &plan.meta_fields {
            data.insert(
                meta_field.response_key.clone(),
                resolve_meta_field(&meta_field.field, root_type_name, &introspection),
            );
        }
    }

    let mut state = ExecutionState {
        data: Value::Object(data),
        errors: vec![],
        captured,
        remaining: plan.nodes.iter().map(|node| node.waits_for.len()).collect(),
    };

    let executor = Executor {
        plan,
        executors,
        context,
    };

    let mut in_flight: FuturesUnordered<BoxFuture<'_, ExecutionJob>> = FuturesUnordered::new();
    for root in &plan.roots {
        in_flight.push(executor.prepare_job_future(&plan.nodes[*root], &state));
    }

    while let Some(job) = in_flight.next().await {
        let node = &plan.nodes[job.node];
        executor.process_job_result(&mut state, job);

        for child in &node.children {
            state.remaining[*child] -= 1;
            if state.remaining[*child] == 0 {
                in_flight.push(executor.prepare_job_future(&plan.nodes[*child], &state));
            }
        }
    }

    strip_internal_fields(&mut state.data);

    PlanExecutionOutput {
        data: state.data,
        errors: state.errors,
        captured: state.captured,
    }
}

impl<'a> Executor<'a> {
    fn prepare_job_future(
        &self,
        node: &'a ExecutableResolverOperationNode,
        state: &ExecutionState,
    ) -> BoxFuture<'a, ExecutionJob> {
        let targets = collect_targets(&state.data, &node.path);
        let (calls, unresolved) = prepare_calls(node, &targets, &state.data, &state.captured);

        debug!(
            node = node.id,
            subgraph = node.subgraph.as_str(),
            kind = %node.kind,
            targets = targets.len(),
            unresolved = unresolved.len(),
            calls = calls.len(),
            "resolver operation ready"
        );

        let executors = self.executors;
        let context = self.context.clone();

        async move {
            if calls.is_empty() {
                return ExecutionJob {
                    node: node.id,
                    targets,
                    unresolved,
                    results: vec![],
                };
            }

            let executor = match executors.get_executor(&node.subgraph).await {
                Ok(executor) => executor,
                Err(err) => {
                    return ExecutionJob {
                        node: node.id,
                        targets,
                        unresolved,
                        results: calls
                            .into_iter()
                            .map(|call| (call.targets, Err(err.clone())))
                            .collect(),
                    }
                }
            };

            trace!(
                node = node.id,
                operation = compact(&node.operation).as_str(),
                "calling subgraph"
            );

            let pending = calls.into_iter().map(|call| {
                let executor = executor.clone();
                let request = SubgraphExecutionRequest {
                    subgraph_name: node.subgraph.clone(),
                    query: node.operation.clone(),
                    operation_name: node.operation_name.clone(),
                    variables: call.variables,
                    headers: HeaderMap::new(),
                    context: context.clone(),
                };
                async move { (call.targets, executor.execute(request).await) }
            });

            ExecutionJob {
                node: node.id,
                targets,
                unresolved,
                results: join_all(pending).await,
            }
        }
        .boxed()
    }

    fn process_job_result(&self, state: &mut ExecutionState, job: ExecutionJob) {
        let node = &self.plan.nodes[job.node];

        for target in &job.unresolved {
            null_unresolved_target(&mut state.data, node, &job.targets[*target]);
        }

        for (call_targets, result) in job.results {
            let failure = match result {
                Ok(response) => {
                    self.merge_response(state, node, &job.targets, &call_targets, response)
                }
                Err(err) => Some(GraphQLError::from(err)),
            };

            if let Some(error) = failure {
                debug!(
                    node = node.id,
                    subgraph = node.subgraph.as_str(),
                    error = error.message.as_str(),
                    "subgraph call failed"
                );
                let path = call_targets
                    .first()
                    .map(|(target, _)| error_path(node, &job.targets[*target]));
                state.errors.push(match path {
                    Some(path) => error.with_path(path),
                    None => error,
                });
                for (target, _) in &call_targets {
                    null_target(&mut state.data, node, &job.targets[*target]);
                }
            }
        }

        for export in &node.exports {
            let export_targets = collect_targets(&state.data, &export.path);
            let mut values = export_targets
                .iter()
                .filter_map(|target| value_at(&state.data, target))
                .map(|object| object.get(&export.name).cloned().unwrap_or(Value::Null));

            // One value per item below a list, a single value otherwise.
            let captured = if export_targets.iter().any(|target| crosses_list(target)) {
                Value::Array(values.collect())
            } else {
                values.next().unwrap_or(Value::Null)
            };
            state.captured.insert(export.name.clone(), captured);
        }
    }

    /// Writes a subgraph response into the tree. Returns an error when nothing usable came back.
    fn merge_response(
        &self,
        state: &mut ExecutionState,
        node: &ExecutableResolverOperationNode,
        targets: &[ResponsePath],
        call_targets: &[(usize, Option<usize>)],
        response: SubgraphResponse,
    ) -> Option<GraphQLError> {
        let mut subgraph_errors = response.errors.unwrap_or_default();
        let result = extract_result(response.data, &node.result_path);

        if result.is_null() && !subgraph_errors.is_empty() {
            return Some(subgraph_errors.remove(0));
        }

        if let Some((first, _)) = call_targets.first() {
            let path = error_path(node, &targets[*first]);
            state
                .errors
                .extend(subgraph_errors.into_iter().map(|error| error.with_path(path.clone())));
        }

        for (target, position) in call_targets {
            let value = match position {
                Some(position) => result.get(*position).cloned().unwrap_or(Value::Null),
                None => result.clone(),
            };
            merge_into_target(&mut state.data, node, &targets[*target], value);
        }

        None
    }
}

/// Builds the calls of `node`, and returns the indexes of targets no call can cover.
fn prepare_calls(
    node: &ExecutableResolverOperationNode,
    targets: &[ResponsePath],
    data: &Value,
    captured: &Map<String, Value>,
) -> (Vec<PreparedCall>, Vec<usize>) {
    let mut shared = Map::new();
    let mut exported = vec![];
    for binding in &node.bindings {
        match &binding.source {
            BindingSource::Value(value) => {
                shared.insert(binding.variable.clone(), resolve_value(value, captured));
            }
            BindingSource::Export(name) => {
                exported.push((binding.variable.as_str(), name.as_str()))
            }
        }
    }

    // Export values of every target; targets missing one cannot be resolved.
    let mut keyed = Vec::with_capacity(targets.len());
    let mut unresolved = vec![];
    for (index, target) in targets.iter().enumerate() {
        let key = value_at(data, target).and_then(|object| {
            exported
                .iter()
                .map(|(_, name)| object.get(*name).filter(|value| !value.is_null()).cloned())
                .collect::<Option<Vec<_>>>()
        });
        match key {
            Some(key) => keyed.push((index, key)),
            None => unresolved.push(index),
        }
    }

    if node.kind == ResolverKind::Batch && !exported.is_empty() {
        if keyed.is_empty() {
            return (vec![], unresolved);
        }

        let mut distinct: Vec<Vec<Value>> = vec![];
        let mut call_targets = Vec::with_capacity(keyed.len());
        for (index, key) in keyed {
            let position = match distinct.iter().position(|existing| *existing == key) {
                Some(position) => position,
                None => {
                    distinct.push(key);
                    distinct.len() - 1
                }
            };
            call_targets.push((index, Some(position)));
        }

        let mut variables = shared;
        for (slot, (variable, _)) in exported.iter().enumerate() {
            variables.insert(
                variable.to_string(),
                Value::Array(distinct.iter().map(|key| key[slot].clone()).collect()),
            );
        }

        return (
            vec![PreparedCall {
                variables,
                targets: call_targets,
            }],
            unresolved,
        );
    }

    let calls = keyed
        .into_iter()
        .map(|(index, key)| {
            let mut variables = shared.clone();
            for ((variable, _), value) in exported.iter().zip(key) {
                variables.insert(variable.to_string(), value);
            }
            PreparedCall {
                variables,
                targets: vec![(index, None)],
            }
        })
        .collect();

    (calls, unresolved)
}

fn crosses_list(path: &ResponsePath) -> bool {
    path.iter()
        .any(|segment| matches!(segment, GraphQLErrorPathSegment::Index(_)))
}

fn error_path(node: &ExecutableResolverOperationNode, target: &ResponsePath) -> ResponsePath {
    let mut path = target.clone();
    if let Some(key) = &node.merge_key {
        path.push(GraphQLErrorPathSegment::String(key.clone()));
    }
    path
}

fn merge_into_target(
    data: &mut Value,
    node: &ExecutableResolverOperationNode,
    target: &ResponsePath,
    value: Value,
) {
    let Some(Value::Object(object)) = value_at_mut(data, target) else {
        return;
    };

    match &node.merge_key {
        Some(key) => match object.get_mut(key) {
            Some(existing) if !existing.is_null() => deep_merge(existing, value),
            _ => {
                object.insert(key.clone(), value);
            }
        },
        None => match value {
            Value::Object(fields) => {
                for (key, field_value) in fields {
                    match object.get_mut(&key) {
                        Some(existing) => deep_merge(existing, field_value),
                        None => {
                            object.insert(key, field_value);
                        }
                    }
                }
            }
            // The entity was not found; its fields resolve to null.
            _ => {
                for key in &node.response_keys {
                    object.entry(key.clone()).or_insert(Value::Null);
                }
            }
        },
    }
}

fn null_target(data: &mut Value, node: &ExecutableResolverOperationNode, target: &ResponsePath) {
    let Some(Value::Object(object)) = value_at_mut(data, target) else {
        return;
    };

    match &node.merge_key {
        Some(key) => {
            object.insert(key.clone(), Value::Null);
        }
        None => {
            for key in &node.response_keys {
                object.insert(key.clone(), Value::Null);
            }
        }
    }
}

/// Fields a node could not resolve for `target` still appear in the response, as null.
fn null_unresolved_target(
    data: &mut Value,
    node: &ExecutableResolverOperationNode,
    target: &ResponsePath,
) {
    let Some(Value::Object(object)) = value_at_mut(data, target) else {
        return;
    };

    match &node.merge_key {
        Some(key) => {
            object.entry(key.clone()).or_insert(Value::Null);
        }
        None => {
            for key in &node.response_keys {
                object.entry(key.clone()).or_insert(Value::Null);
            }
        }
    }
}
