use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use fusion_supergraph::TransportEntry;
use tracing::debug;

use crate::executors::{
    common::{SubgraphExecutor, SubgraphExecutorBoxedArc, SubgraphExecutorResolver},
    error::SubgraphExecutorError,
    http::{HttpSubgraphExecutor, HTTP_TRANSPORT_KIND},
};

/// A fixed set of executors, built up front.
#[derive(Default, Clone)]
pub struct SubgraphExecutorMap {
    inner: HashMap<String, SubgraphExecutorBoxedArc>,
}

impl SubgraphExecutorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_boxed_arc(&mut self, subgraph_name: String, boxed_arc: SubgraphExecutorBoxedArc) {
        self.inner.insert(subgraph_name, boxed_arc);
    }

    pub fn get(&self, subgraph_name: &str) -> Option<&SubgraphExecutorBoxedArc> {
        self.inner.get(subgraph_name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Builds one HTTP executor per transport entry, all sharing a single client.
    pub fn from_transport_entries<'a>(
        entries: impl IntoIterator<Item = &'a TransportEntry>,
    ) -> Result<Self, SubgraphExecutorError> {
        let http_client = Arc::new(reqwest::Client::new());
        let mut map = Self::new();

        for entry in entries {
            if entry.kind != HTTP_TRANSPORT_KIND {
                return Err(SubgraphExecutorError::UnsupportedTransport {
                    subgraph: entry.subgraph.clone(),
                    kind: entry.kind.clone(),
                });
            }

            debug!(
                subgraph = entry.subgraph.as_str(),
                location = entry.location.as_str(),
                "registering http executor"
            );
            let executor = HttpSubgraphExecutor::from_transport(entry, http_client.clone())?;
            map.insert_boxed_arc(entry.subgraph.clone(), executor.to_boxed_arc());
        }

        Ok(map)
    }
}

#[async_trait]
impl SubgraphExecutorResolver for SubgraphExecutorMap {
    async fn get_executor(
        &self,
        subgraph_name: &str,
    ) -> Result<SubgraphExecutorBoxedArc, SubgraphExecutorError> {
        self.inner
            .get(subgraph_name)
            .cloned()
            .ok_or_else(|| SubgraphExecutorError::UnknownSubgraph(subgraph_name.to_string()))
    }
}
