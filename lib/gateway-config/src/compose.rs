use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::primitives::file_path::FilePath;

/// Input of the `compose` command: the subgraphs to merge and where to write the result.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ComposeConfig {
    pub subgraphs: Vec<ComposeSubgraphConfig>,
    /// Where the supergraph is written. Printed to stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<FilePath>,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ComposeSubgraphConfig {
    /// Unique subgraph name, used as the source tag of every element it contributes.
    pub name: String,
    /// Path to the subgraph SDL.
    pub schema: FilePath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportConfig>,
    /// Prefix added to every type name of this subgraph, except root types and built-in scalars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_prefix: Option<String>,
}

/// How the gateway reaches a subgraph. Stored in the supergraph as `@transport`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    #[serde(default = "default_transport_kind")]
    pub kind: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Transport specific options, for example `timeout: 5s` for `http`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, Value>,
}

fn default_transport_kind() -> String {
    "http".to_string()
}
