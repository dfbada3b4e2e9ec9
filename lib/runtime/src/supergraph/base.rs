use std::time::Duration;

use async_trait::async_trait;
use fusion_supergraph::SupergraphError;

#[derive(Debug, thiserror::Error)]
pub enum LoadSupergraphError {
    #[error("Failed to read supergraph file: {0}")]
    ReadFileError(#[from] std::io::Error),
    #[error("Failed to parse supergraph: {0}")]
    ParseError(#[from] SupergraphError),
    #[error("Invalid supergraph source: {0}")]
    InvalidConfiguration(String),
}

/// Outcome of asking a source for the latest supergraph.
#[derive(Debug, PartialEq, Eq)]
pub enum ReloadSupergraphResult {
    Unchanged,
    Changed { new_sdl: String },
}

/// Somewhere a supergraph can be read from.
#[async_trait]
pub trait SupergraphLoader: Send + Sync {
    /// Label used in logs.
    fn source_name(&self) -> &'static str;

    async fn load(&self) -> Result<ReloadSupergraphResult, LoadSupergraphError>;

    /// `None` means the source is read once, at startup.
    fn reload_interval(&self) -> Option<Duration> {
        None
    }
}

pub type BoxedSupergraphLoader = Box<dyn SupergraphLoader>;
