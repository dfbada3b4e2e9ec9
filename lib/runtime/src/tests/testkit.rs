use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, Once,
    },
};

use async_trait::async_trait;
use fusion_composition::{compose_subgraphs, SubgraphConfig};
use fusion_plan_executor::{
    executors::{
        common::{SubgraphExecutionRequest, SubgraphExecutor, SubgraphExecutorBoxedArc},
        error::SubgraphExecutorError,
        transport::{SubgraphSchemaAccessor, TransportFactory},
    },
    response::subgraph_response::SubgraphResponse,
    GatewayPlugins,
};
use fusion_supergraph::{ast::parse_schema, Supergraph, TransportEntry};
use lazy_static::lazy_static;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    gateway::{Gateway, GatewayOptions},
    plan_cache::PlanCache,
    schema_state::SchemaState,
};

fn init_test_logger_internal() {
    let tree_layer = tracing_tree::HierarchicalLayer::new(2)
        .with_bracketed_fields(true)
        .with_deferred_spans(false)
        .with_wraparound(25)
        .with_indent_lines(true)
        .with_timer(tracing_tree::time::Uptime::default())
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_targets(false);

    tracing_subscriber::registry()
        .with(tree_layer)
        .with(EnvFilter::from_default_env())
        .init();
}

lazy_static! {
    static ref TRACING_INIT: Once = Once::new();
}

pub fn init_logger() {
    TRACING_INIT.call_once(|| {
        init_test_logger_internal();
    });
}

pub const MOCK_TRANSPORT_KIND: &str = "mock";

/// Answers every call with the root field named like its subgraph, valued with that name.
#[derive(Clone)]
pub struct EchoExecutor {
    subgraph_name: String,
    fail: bool,
    calls: Arc<Mutex<Vec<SubgraphExecutionRequest>>>,
}

#[async_trait]
impl SubgraphExecutor for EchoExecutor {
    async fn execute(
        &self,
        execution_request: SubgraphExecutionRequest,
    ) -> Result<SubgraphResponse, SubgraphExecutorError> {
        self.calls.lock().unwrap().push(execution_request);

        if self.fail {
            return Err(SubgraphExecutorError::RequestFailure(
                self.subgraph_name.clone(),
                "connection refused".to_string(),
            ));
        }

        Ok(SubgraphResponse::with_data(
            json!({ self.subgraph_name.as_str(): self.subgraph_name.as_str() }),
        ))
    }
}

/// Factory for `kind: "mock"` transports. Subgraphs listed in `failing` answer with a transport error.
#[derive(Default)]
pub struct MockTransport {
    pub failing: Vec<String>,
    pub created: AtomicUsize,
    pub calls: Arc<Mutex<Vec<SubgraphExecutionRequest>>>,
    pub schemas: Mutex<HashMap<String, String>>,
}

impl MockTransport {
    pub fn failing(subgraphs: &[&str]) -> Self {
        Self {
            failing: subgraphs.iter().map(|name| name.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<SubgraphExecutionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransportFactory for MockTransport {
    async fn create_executor(
        &self,
        transport: &TransportEntry,
        schema: &SubgraphSchemaAccessor<'_>,
        subgraph_name: &str,
    ) -> Result<SubgraphExecutorBoxedArc, SubgraphExecutorError> {
        if transport.kind != MOCK_TRANSPORT_KIND {
            return Err(SubgraphExecutorError::UnsupportedTransport {
                subgraph: subgraph_name.to_string(),
                kind: transport.kind.clone(),
            });
        }

        let sdl = schema
            .schema()
            .map_err(|err| {
                SubgraphExecutorError::ExecutorBuildFailure(subgraph_name.to_string(), err.to_string())
            })?
            .to_string();
        self.schemas
            .lock()
            .unwrap()
            .insert(subgraph_name.to_string(), sdl);
        self.created.fetch_add(1, Ordering::SeqCst);

        Ok(EchoExecutor {
            subgraph_name: subgraph_name.to_string(),
            fail: self.failing.iter().any(|name| name == subgraph_name),
            calls: self.calls.clone(),
        }
        .to_boxed_arc())
    }
}

pub fn mock_transport(subgraph_name: &str, kind: &str) -> TransportEntry {
    TransportEntry {
        subgraph: subgraph_name.to_string(),
        kind: kind.to_string(),
        location: format!("mock://{}", subgraph_name),
        ..Default::default()
    }
}

/// One subgraph per name, each owning the root field of the same name.
pub fn echo_supergraph(names: &[&str]) -> Supergraph {
    compose_subgraphs(
        names
            .iter()
            .map(|name| {
                let sdl = format!("type Query {{ {}: String }}", name);
                SubgraphConfig::new(*name, parse_schema(&sdl).unwrap())
                    .with_transport(mock_transport(name, MOCK_TRANSPORT_KIND))
            })
            .collect(),
    )
    .expect("echo subgraphs should compose")
}

pub fn schema_state(transport: Arc<MockTransport>, plugins: GatewayPlugins) -> Arc<SchemaState> {
    Arc::new(SchemaState::new(transport, plugins, PlanCache::new(100)))
}

pub fn gateway_with(
    names: &[&str],
    transport: Arc<MockTransport>,
    options: GatewayOptions,
) -> Gateway {
    let state = schema_state(transport, Arc::new(vec![]));
    state.set_supergraph(echo_supergraph(names));
    Gateway::new(state, options)
}
