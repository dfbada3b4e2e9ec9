use std::sync::Arc;

use async_trait::async_trait;
use fusion_supergraph::{
    ast::SchemaDocument, extract_subgraph, Supergraph, SupergraphError, TransportEntry,
};

use crate::executors::{
    common::{SubgraphExecutor, SubgraphExecutorBoxedArc},
    error::SubgraphExecutorError,
    http::{HttpSubgraphExecutor, HTTP_TRANSPORT_KIND},
};

/// Lazy access to the standalone schema of the subgraph an executor is built for.
/// Extraction only runs when a factory asks for it.
pub struct SubgraphSchemaAccessor<'a> {
    supergraph: &'a Supergraph,
    subgraph_name: &'a str,
}

impl<'a> SubgraphSchemaAccessor<'a> {
    pub fn new(supergraph: &'a Supergraph, subgraph_name: &'a str) -> Self {
        Self {
            supergraph,
            subgraph_name,
        }
    }

    pub fn schema(&self) -> Result<SchemaDocument, SupergraphError> {
        extract_subgraph(self.supergraph, self.subgraph_name)
    }
}

/// Builds the executor of one subgraph from its transport settings.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create_executor(
        &self,
        transport: &TransportEntry,
        schema: &SubgraphSchemaAccessor<'_>,
        subgraph_name: &str,
    ) -> Result<SubgraphExecutorBoxedArc, SubgraphExecutorError>;
}

/// Factory for `kind: "http"` transports. Every executor shares one client.
#[derive(Clone, Default)]
pub struct HttpTransport {
    http_client: Arc<reqwest::Client>,
}

impl HttpTransport {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client: Arc::new(http_client),
        }
    }
}

#[async_trait]
impl TransportFactory for HttpTransport {
    async fn create_executor(
        &self,
        transport: &TransportEntry,
        _schema: &SubgraphSchemaAccessor<'_>,
        subgraph_name: &str,
    ) -> Result<SubgraphExecutorBoxedArc, SubgraphExecutorError> {
        if transport.kind != HTTP_TRANSPORT_KIND {
            return Err(SubgraphExecutorError::UnsupportedTransport {
                subgraph: subgraph_name.to_string(),
                kind: transport.kind.clone(),
            });
        }

        Ok(HttpSubgraphExecutor::from_transport(transport, self.http_client.clone())?.to_boxed_arc())
    }
}
