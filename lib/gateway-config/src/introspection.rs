use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(deny_unknown_fields)]
pub struct IntrospectionConfig {
    /// Answer introspection operations from the active supergraph.
    /// When disabled, introspection fields are rejected before planning.
    #[serde(default = "default_introspection_enabled")]
    pub enabled: bool,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            enabled: default_introspection_enabled(),
        }
    }
}

fn default_introspection_enabled() -> bool {
    true
}
