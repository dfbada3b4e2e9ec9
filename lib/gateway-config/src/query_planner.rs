use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(deny_unknown_fields)]
pub struct QueryPlannerConfig {
    /// A flag to allow exposing the query plan in the response.
    /// When set to `true` and an incoming request asks for it, the compiled plan is returned as part of `extensions.queryPlan`.
    ///
    /// Can also be set via the `EXPOSE_QUERY_PLAN` environment variable.
    #[serde(default = "default_query_planning_allow_expose")]
    pub allow_expose: bool,
    /// Maximum number of compiled plans kept in memory.
    /// The cache is cleared whenever a new supergraph is loaded.
    ///
    /// Default: 1000.
    #[serde(default = "default_plan_cache_size")]
    pub cache_size: u64,
}

impl Default for QueryPlannerConfig {
    fn default() -> Self {
        Self {
            allow_expose: default_query_planning_allow_expose(),
            cache_size: default_plan_cache_size(),
        }
    }
}

fn default_query_planning_allow_expose() -> bool {
    false
}

fn default_plan_cache_size() -> u64 {
    1000
}
