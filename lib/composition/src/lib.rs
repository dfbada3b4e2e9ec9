pub mod annotate;
pub mod conventions;
pub mod error;
pub mod merge;
pub mod schema_utils;
pub mod transforms;
pub mod wiring;

use std::collections::HashSet;

use fusion_supergraph::{ast::SchemaDocument, MetadataTable, Supergraph, TransportEntry};
use tracing::{debug, info};

pub use error::CompositionError;
pub use transforms::{RenameFieldTransform, RenameTypeTransform, SubgraphTransform};

/// One subgraph handed to composition.
pub struct SubgraphConfig {
    pub name: String,
    pub schema: SchemaDocument,
    /// Applied after annotation, in order.
    pub transforms: Vec<Box<dyn SubgraphTransform>>,
    pub transport: Option<TransportEntry>,
}

impl SubgraphConfig {
    pub fn new(name: impl Into<String>, schema: SchemaDocument) -> Self {
        Self {
            name: name.into(),
            schema,
            transforms: vec![],
            transport: None,
        }
    }

    pub fn with_transform(mut self, transform: impl SubgraphTransform + 'static) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    pub fn with_transport(mut self, transport: TransportEntry) -> Self {
        self.transport = Some(transport);
        self
    }
}

/// A subgraph schema after annotation: canonical root types plus its fusion metadata.
#[derive(Debug, Clone)]
pub struct AnnotatedSubgraph {
    pub name: String,
    pub document: SchemaDocument,
    pub metadata: MetadataTable,
}

/// Annotates, transforms, wires and merges subgraphs into one supergraph.
pub fn compose_subgraphs(subgraphs: Vec<SubgraphConfig>) -> Result<Supergraph, CompositionError> {
    let mut seen = HashSet::new();
    for subgraph in &subgraphs {
        if !seen.insert(subgraph.name.clone()) {
            return Err(CompositionError::DuplicateSubgraph(subgraph.name.clone()));
        }
    }

    let mut annotated = Vec::with_capacity(subgraphs.len());
    for subgraph in subgraphs {
        debug!(subgraph = subgraph.name, "annotating subgraph");
        let mut result = annotate::annotate_subgraph(&subgraph);

        for transform in &subgraph.transforms {
            result = transform.transform(result);
        }

        annotated.push(result);
    }

    wiring::wire_entity_resolvers(&mut annotated);

    let supergraph = merge::merge_subgraphs(annotated)?;
    info!(
        id = supergraph.id(),
        subgraphs = supergraph.subgraph_names().len(),
        "supergraph composed"
    );

    Ok(supergraph)
}
