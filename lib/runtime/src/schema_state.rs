use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use fusion_gateway_config::FusionGatewayConfig;
use fusion_gateway_internal::background_tasks::{BackgroundTask, BackgroundTasksManager};
use fusion_plan_executor::{executors::transport::TransportFactory, GatewayPlugins};
use fusion_supergraph::Supergraph;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::{
    executor_registry::ExecutorRegistry,
    plan_cache::PlanCache,
    supergraph::{
        base::{
            BoxedSupergraphLoader, LoadSupergraphError, ReloadSupergraphResult, SupergraphLoader,
        },
        resolve_from_config,
    },
};

/// Everything tied to one version of the supergraph. Requests hold an `Arc` to it,
/// so a swap never affects work already in flight.
pub struct SupergraphData {
    pub supergraph: Arc<Supergraph>,
    pub executors: Arc<ExecutorRegistry>,
}

pub struct SchemaState {
    current_swapable: ArcSwapOption<SupergraphData>,
    transport_factory: Arc<dyn TransportFactory>,
    plugins: GatewayPlugins,
    pub plan_cache: PlanCache,
}

impl SchemaState {
    pub fn new(
        transport_factory: Arc<dyn TransportFactory>,
        plugins: GatewayPlugins,
        plan_cache: PlanCache,
    ) -> Self {
        Self {
            current_swapable: ArcSwapOption::empty(),
            transport_factory,
            plugins,
            plan_cache,
        }
    }

    /// Loads the configured supergraph once, then keeps polling it in the background
    /// when the source has a poll interval.
    pub async fn new_from_config(
        bg_tasks_manager: &mut BackgroundTasksManager,
        config: &FusionGatewayConfig,
        transport_factory: Arc<dyn TransportFactory>,
        plugins: GatewayPlugins,
    ) -> Result<Arc<Self>, LoadSupergraphError> {
        let loader = resolve_from_config(&config.supergraph)?;
        let state = Arc::new(Self::new(
            transport_factory,
            plugins,
            PlanCache::new(config.query_planner.cache_size),
        ));

        state.reload_from_loader(loader.as_ref()).await?;

        if loader.reload_interval().is_some() {
            bg_tasks_manager.register_task(Arc::new(SupergraphBackgroundLoaderTask {
                loader,
                state: state.clone(),
            }));
        }

        Ok(state)
    }

    pub fn current_supergraph(&self) -> Option<Arc<SupergraphData>> {
        self.current_swapable.load_full()
    }

    pub fn is_ready(&self) -> bool {
        self.current_swapable.load().is_some()
    }

    /// Makes `supergraph` the active one. Executors are rebuilt lazily and cached plans dropped.
    /// Swapping in an identical supergraph keeps the current data.
    pub fn set_supergraph(&self, supergraph: Supergraph) -> Arc<SupergraphData> {
        if let Some(current) = self.current_supergraph() {
            if current.supergraph.id() == supergraph.id() {
                debug!(id = supergraph.id(), "supergraph unchanged, keeping current state");
                return current;
            }
        }

        let supergraph = Arc::new(supergraph);
        let data = Arc::new(SupergraphData {
            executors: Arc::new(ExecutorRegistry::new(
                supergraph.clone(),
                self.transport_factory.clone(),
                self.plugins.clone(),
            )),
            supergraph,
        });

        self.current_swapable.store(Some(data.clone()));
        self.plan_cache.invalidate_all();
        info!(id = data.supergraph.id(), "supergraph updated");

        data
    }

    pub fn reload_from_sdl(&self, sdl: &str) -> Result<Arc<SupergraphData>, LoadSupergraphError> {
        let supergraph = Supergraph::parse(sdl)?;

        Ok(self.set_supergraph(supergraph))
    }

    /// Asks `loader` for a new version. Returns `true` when the active supergraph changed.
    pub async fn reload_from_loader(
        &self,
        loader: &dyn SupergraphLoader,
    ) -> Result<bool, LoadSupergraphError> {
        match loader.load().await? {
            ReloadSupergraphResult::Unchanged => {
                debug!("Supergraph fetched successfully with no changes");
                Ok(false)
            }
            ReloadSupergraphResult::Changed { new_sdl } => {
                let previous = self.current_supergraph().map(|data| data.supergraph.id());
                let current = self.reload_from_sdl(&new_sdl)?;
                Ok(previous != Some(current.supergraph.id()))
            }
        }
    }
}

pub struct SupergraphBackgroundLoaderTask {
    loader: BoxedSupergraphLoader,
    state: Arc<SchemaState>,
}

#[async_trait]
impl BackgroundTask for SupergraphBackgroundLoaderTask {
    fn id(&self) -> &str {
        "supergraph-background-loader"
    }

    async fn run(&self, token: CancellationToken) {
        let Some(interval) = self.loader.reload_interval() else {
            debug!("poll interval not configured for supergraph changes, nothing to do");
            return;
        };

        loop {
            debug!(
                "waiting for {:?}ms before checking again for supergraph changes",
                interval.as_millis()
            );

            tokio::select! {
                _ = token.cancelled() => {
                    trace!("Background task cancelled");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            // A broken file keeps the previous supergraph active.
            if let Err(err) = self.state.reload_from_loader(self.loader.as_ref()).await {
                error!("Failed to load supergraph: {}", err);
            }
        }
    }
}
