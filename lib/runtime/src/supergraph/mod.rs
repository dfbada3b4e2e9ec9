use fusion_gateway_config::supergraph::SupergraphSource;
use tracing::debug;

use crate::supergraph::{
    base::{BoxedSupergraphLoader, LoadSupergraphError},
    file::SupergraphFileLoader,
};

pub mod base;
pub mod file;

/// Builds the loader described by the `supergraph` section of the configuration.
pub fn resolve_from_config(
    source: &SupergraphSource,
) -> Result<BoxedSupergraphLoader, LoadSupergraphError> {
    let loader: BoxedSupergraphLoader = match source {
        SupergraphSource::File {
            path,
            poll_interval,
        } => Box::new(SupergraphFileLoader::new(&path.absolute, *poll_interval)?),
    };

    debug!(source = loader.source_name(), "supergraph loader ready");

    Ok(loader)
}
