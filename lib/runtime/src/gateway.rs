use std::sync::Arc;

use fusion_gateway_config::FusionGatewayConfig;
use fusion_plan_executor::{
    execute_plan,
    introspection::{is_introspection_only, resolve_introspection, IntrospectionContext},
    response::response::GraphQLResponse,
    variables::seed_variables,
    RequestContext,
};
use fusion_query_planner::{
    build_plan,
    flatten::{flatten_selection_set, fragments_of, FlattenedField},
    operation::{default_variable_values, select_operation},
    CompiledPlan, PlanningError,
};
use fusion_supergraph::{
    ast::{parse_operation, QueryDocument},
    Supergraph,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, trace};

use crate::{error::GatewayError, plan_cache::PlanCache, schema_state::SchemaState};

/// Client header asking for `extensions.queryPlan`. Honoured only when exposing plans is allowed.
pub const EXPOSE_QUERY_PLAN_HEADER: &str = "fusion-expose-query-plan";

const INTROSPECTION_OPERATION_NAME: &str = "IntrospectionQuery";

#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub allow_expose_query_plan: bool,
    pub introspection_enabled: bool,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            allow_expose_query_plan: false,
            introspection_enabled: true,
        }
    }
}

impl From<&FusionGatewayConfig> for GatewayOptions {
    fn from(config: &FusionGatewayConfig) -> Self {
        Self {
            allow_expose_query_plan: config.query_planner.allow_expose,
            introspection_enabled: config.introspection.enabled,
        }
    }
}

/// A GraphQL request as sent by clients.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRequest {
    pub query: String,
    #[serde(default)]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub variables: Option<Map<String, Value>>,
    #[serde(default)]
    pub extensions: Option<Map<String, Value>>,
    /// Set by the host when the client asked to see the plan.
    #[serde(skip)]
    pub expose_query_plan: bool,
}

impl GatewayRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_query_plan(mut self) -> Self {
        self.expose_query_plan = true;
        self
    }
}

pub struct Gateway {
    schema_state: Arc<SchemaState>,
    options: GatewayOptions,
}

impl Gateway {
    pub fn new(schema_state: Arc<SchemaState>, options: GatewayOptions) -> Self {
        Self {
            schema_state,
            options,
        }
    }

    pub fn from_config(schema_state: Arc<SchemaState>, config: &FusionGatewayConfig) -> Self {
        Self::new(schema_state, GatewayOptions::from(config))
    }

    pub fn schema_state(&self) -> &Arc<SchemaState> {
        &self.schema_state
    }

    /// Runs one request against the active supergraph. Never fails: request-level
    /// errors become a response with `data: null`.
    #[instrument(level = "debug", skip_all, fields(operation_name = request.operation_name.as_deref()))]
    pub async fn execute(&self, request: GatewayRequest, context: RequestContext) -> GraphQLResponse {
        match self.try_execute(&request, context).await {
            Ok(response) => response,
            Err(err) => {
                debug!(code = err.error_code(), "request failed: {}", err);
                GraphQLResponse::from_error(err.into())
            }
        }
    }

    async fn try_execute(
        &self,
        request: &GatewayRequest,
        context: RequestContext,
    ) -> Result<GraphQLResponse, GatewayError> {
        // Held until the end, so a concurrent reload cannot change the schema mid-request.
        let data = self
            .schema_state
            .current_supergraph()
            .ok_or(GatewayError::SupergraphNotReady)?;
        let document = parse_operation(&request.query)
            .map_err(|err| GatewayError::ParseFailure(err.to_string()))?;

        if let Some(response) = self.try_introspection(&data.supergraph, &document, request)? {
            return Ok(response);
        }

        let expose_query_plan = self.options.allow_expose_query_plan
            && (request.expose_query_plan || asks_for_query_plan(&context));
        let plan = self.plan(&data.supergraph, &document, request).await?;
        let output = execute_plan(
            &plan,
            &data.supergraph,
            request.variables.as_ref(),
            data.executors.as_ref(),
            Arc::new(context),
        )
        .await;

        let response = output.into_response();
        if !expose_query_plan {
            return Ok(response);
        }

        match serde_json::to_value(plan.as_ref()) {
            Ok(plan) => Ok(response.with_extension("queryPlan", plan)),
            Err(err) => {
                debug!("failed to serialize query plan: {}", err);
                Ok(response)
            }
        }
    }

    /// Returns the cached plan of `request`, planning it on a miss.
    pub async fn plan(
        &self,
        supergraph: &Supergraph,
        document: &QueryDocument,
        request: &GatewayRequest,
    ) -> Result<Arc<CompiledPlan>, GatewayError> {
        let operation_name = request.operation_name.as_deref();
        let plan_cache = &self.schema_state.plan_cache;
        let key = PlanCache::key(supergraph.id(), &request.query, operation_name);

        if let Some(plan) = plan_cache.get(key).await {
            trace!(key, "plan cache hit");
            return Ok(plan);
        }

        trace!(key, "plan cache miss");
        let plan = Arc::new(build_plan(supergraph, document, operation_name)?);
        plan_cache.insert(key, plan.clone()).await;

        Ok(plan)
    }

    /// Answers introspection from the schema itself. `None` means the operation must be planned.
    fn try_introspection(
        &self,
        supergraph: &Supergraph,
        document: &QueryDocument,
        request: &GatewayRequest,
    ) -> Result<Option<GraphQLResponse>, GatewayError> {
        let operation = select_operation(document, request.operation_name.as_deref())?;
        let fragments = fragments_of(document);
        let fields = flatten_selection_set(operation.selection_set, &fragments)?;

        if !self.options.introspection_enabled && fields.iter().any(is_schema_introspection) {
            return Err(GatewayError::IntrospectionDisabled);
        }

        let named_introspection = operation.name == Some(INTROSPECTION_OPERATION_NAME);
        if !named_introspection && !is_introspection_only(&fields) {
            return Ok(None);
        }

        let root_type_name = supergraph
            .root_type_name(operation.kind)
            .ok_or_else(|| PlanningError::UnresolvedRootType(operation.kind.to_string()))?;
        let declared = operation
            .variable_definitions
            .iter()
            .map(|definition| definition.name.clone())
            .collect::<Vec<_>>();
        let variables = seed_variables(
            &default_variable_values(operation.variable_definitions),
            request.variables.as_ref(),
            &declared,
        );

        debug!("answering introspection without planning");
        let ctx = IntrospectionContext::new(supergraph, &variables);

        Ok(Some(GraphQLResponse {
            data: resolve_introspection(&fields, root_type_name, &ctx),
            ..Default::default()
        }))
    }
}

fn is_schema_introspection(field: &FlattenedField) -> bool {
    field.name == "__schema" || field.name == "__type"
}

fn asks_for_query_plan(context: &RequestContext) -> bool {
    context
        .headers
        .get(EXPOSE_QUERY_PLAN_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("true"))
}
