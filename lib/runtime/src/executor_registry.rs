use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use dashmap::DashMap;
use fusion_plan_executor::{
    executors::{
        common::{SubgraphExecutorBoxedArc, SubgraphExecutorResolver},
        error::SubgraphExecutorError,
        transport::{SubgraphSchemaAccessor, TransportFactory},
    },
    wrap_with_hooks, GatewayPlugins,
};
use fusion_supergraph::{Supergraph, TransportEntry};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

type ExecutorCell = Arc<OnceCell<SubgraphExecutorBoxedArc>>;

/// Executors of one supergraph, built on first use and memoized by subgraph name.
///
/// Creation runs at most once per subgraph at a time; a failed creation is retried
/// by the next call.
pub struct ExecutorRegistry {
    supergraph: Arc<Supergraph>,
    transports: BTreeMap<String, TransportEntry>,
    factory: Arc<dyn TransportFactory>,
    plugins: GatewayPlugins,
    executors: DashMap<String, ExecutorCell>,
}

impl ExecutorRegistry {
    pub fn new(
        supergraph: Arc<Supergraph>,
        factory: Arc<dyn TransportFactory>,
        plugins: GatewayPlugins,
    ) -> Self {
        let transports = supergraph.transport_entries();

        Self {
            supergraph,
            transports,
            factory,
            plugins,
            executors: DashMap::new(),
        }
    }

    /// Number of executors built so far.
    pub fn len(&self) -> usize {
        self.executors
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn create_executor(
        &self,
        subgraph_name: &str,
    ) -> Result<SubgraphExecutorBoxedArc, SubgraphExecutorError> {
        let transport = self
            .transports
            .get(subgraph_name)
            .ok_or_else(|| SubgraphExecutorError::UnknownSubgraph(subgraph_name.to_string()))?;

        debug!(
            subgraph = subgraph_name,
            kind = transport.kind.as_str(),
            location = transport.location.as_str(),
            "creating subgraph executor"
        );

        let accessor = SubgraphSchemaAccessor::new(&self.supergraph, subgraph_name);
        let executor = self
            .factory
            .create_executor(transport, &accessor, subgraph_name)
            .await
            .inspect_err(|err| warn!(subgraph = subgraph_name, "{}", err))?;

        Ok(wrap_with_hooks(subgraph_name, executor, &self.plugins))
    }
}

#[async_trait]
impl SubgraphExecutorResolver for ExecutorRegistry {
    async fn get_executor(
        &self,
        subgraph_name: &str,
    ) -> Result<SubgraphExecutorBoxedArc, SubgraphExecutorError> {
        // The map guard is released before awaiting.
        let cell = self
            .executors
            .entry(subgraph_name.to_string())
            .or_default()
            .clone();

        cell.get_or_try_init(|| self.create_executor(subgraph_name))
            .await
            .cloned()
    }
}
