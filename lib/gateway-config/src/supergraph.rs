use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::primitives::file_path::FilePath;

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(tag = "source")]
pub enum SupergraphSource {
    /// Loads a supergraph from the filesystem.
    /// The path can be either absolute or relative to the configuration file.
    #[serde(rename = "file")]
    File {
        path: FilePath,
        /// Optional interval at which the file is checked for changes.
        /// When unset, the supergraph is loaded once.
        ///
        /// Can also be set via the `SUPERGRAPH_POLL_INTERVAL` environment variable.
        #[serde(
            default,
            deserialize_with = "humantime_serde::deserialize",
            serialize_with = "humantime_serde::serialize"
        )]
        #[schemars(with = "Option<String>")]
        poll_interval: Option<Duration>,
    },
}

impl Default for SupergraphSource {
    fn default() -> Self {
        SupergraphSource::File {
            path: "supergraph.graphql".into(),
            poll_interval: None,
        }
    }
}

impl SupergraphSource {
    pub fn source_name(&self) -> &'static str {
        match self {
            SupergraphSource::File { .. } => "file",
        }
    }
}
